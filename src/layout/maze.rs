use super::ports::RoutePort;
use super::types::{Dir, EdgeSide, NodeLayout, Rect, EPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub usize);

/// Directions that lead out of a node from one of its internal vertices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitSet(u8);

impl ExitSet {
    pub fn insert(&mut self, dir: Dir) {
        self.0 |= 1 << dir.index();
    }

    pub fn contains(&self, dir: Dir) -> bool {
        self.0 & (1 << dir.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalMark {
    pub cell: CellId,
    /// Empty only for the cell's center vertex, which may leave any way.
    pub exits: ExitSet,
}

#[derive(Debug, Clone)]
pub struct GridVertex {
    pub x: f32,
    pub y: f32,
    pub links: [Option<VertexId>; 4],
    pub internal: Option<InternalMark>,
}

impl GridVertex {
    pub fn point(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn neighbor(&self, dir: Dir) -> Option<VertexId> {
        self.links[dir.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Node(usize),
    Guide,
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub kind: CellKind,
    pub visible: Rect,
    pub obstacle: Rect,
    pub center: (f32, f32),
    pub center_vertex: Option<VertexId>,
    /// Internal vertices lying on one of the cell's axis lines.
    pub axis_vertices: Vec<VertexId>,
}

/// Sparse visibility grid over node boxes, cluster frames and guide points.
#[derive(Debug, Clone, Default)]
pub struct Maze {
    xs: Vec<f32>,
    ys: Vec<f32>,
    vertices: Vec<GridVertex>,
    cells: Vec<Cell>,
    node_cells: Vec<Option<CellId>>,
    guide_cells: Vec<((f32, f32), CellId)>,
    bounds_x: Vec<f32>,
    bounds_y: Vec<f32>,
    canvas: Option<Rect>,
}

fn sorted_lines(mut values: Vec<f32>) -> Vec<f32> {
    values.retain(|v| v.is_finite());
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() <= EPS);
    values
}

fn midpoints(bounds: &[f32]) -> Vec<f32> {
    bounds.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}

fn find_line(lines: &[f32], value: f32) -> Option<usize> {
    let idx = lines.partition_point(|line| *line < value - EPS);
    match lines.get(idx) {
        Some(line) if (line - value).abs() <= EPS => Some(idx),
        _ => None,
    }
}

/// Index range of lines strictly inside `(lo, hi)`.
fn lines_within(lines: &[f32], lo: f32, hi: f32) -> std::ops::Range<usize> {
    let start = lines.partition_point(|line| *line <= lo + EPS);
    let end = lines.partition_point(|line| *line < hi - EPS);
    start..end.max(start)
}

impl Maze {
    /// Builds the grid. `nodes` keeps input order; virtual nodes get no cell.
    /// `ports` lists the side ports in use per node index.
    pub fn build(
        nodes: &[NodeLayout],
        clusters: &[Rect],
        ports: &[(usize, RoutePort)],
        guides: &[(f32, f32)],
        pad: f32,
    ) -> Self {
        let real: Vec<(usize, &NodeLayout)> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_virtual)
            .collect();

        let mut extent: Option<Rect> = None;
        let mut grow = |rect: Rect| {
            extent = Some(match extent {
                Some(current) => current.union(&rect),
                None => rect,
            });
        };
        for (_, node) in &real {
            grow(node.obstacle_rect());
        }
        for rect in clusters {
            grow(*rect);
        }
        for &(x, y) in guides {
            grow(Rect {
                left: x,
                top: y,
                right: x,
                bottom: y,
            });
        }
        let Some(extent) = extent else {
            return Self {
                node_cells: vec![None; nodes.len()],
                ..Self::default()
            };
        };
        let canvas = extent.pad(pad.max(1.0));

        // Boundary lines: obstacle and cluster edges plus the canvas frame.
        let mut grid_bx = vec![canvas.left, canvas.right];
        let mut grid_by = vec![canvas.top, canvas.bottom];
        for (_, node) in &real {
            let obstacle = node.obstacle_rect();
            grid_bx.extend([obstacle.left, obstacle.right]);
            grid_by.extend([obstacle.top, obstacle.bottom]);
        }
        for rect in clusters {
            grid_bx.extend([rect.left, rect.right]);
            grid_by.extend([rect.top, rect.bottom]);
        }
        let grid_bx = sorted_lines(grid_bx);
        let grid_by = sorted_lines(grid_by);

        // Channel brackets also see the visible node edges.
        let mut bounds_x = grid_bx.clone();
        let mut bounds_y = grid_by.clone();
        for (_, node) in &real {
            let visible = node.visible_rect();
            bounds_x.extend([visible.left, visible.right]);
            bounds_y.extend([visible.top, visible.bottom]);
        }

        let mut xs = midpoints(&grid_bx);
        let mut ys = midpoints(&grid_by);
        for (_, node) in &real {
            let (cx, cy) = node.center();
            xs.push(cx);
            ys.push(cy);
        }
        for (_, port) in ports {
            match port.line() {
                Some((true, x)) => xs.push(x),
                Some((false, y)) => ys.push(y),
                None => {}
            }
        }
        for &(x, y) in guides {
            xs.push(x);
            ys.push(y);
        }

        let mut maze = Self {
            xs: sorted_lines(xs),
            ys: sorted_lines(ys),
            vertices: Vec::new(),
            cells: Vec::new(),
            node_cells: vec![None; nodes.len()],
            guide_cells: Vec::new(),
            bounds_x: sorted_lines(bounds_x),
            bounds_y: sorted_lines(bounds_y),
            canvas: Some(canvas),
        };
        maze.link_vertices();
        for (index, node) in real {
            let node_ports: Vec<RoutePort> = ports
                .iter()
                .filter(|(owner, _)| *owner == index)
                .map(|(_, port)| *port)
                .collect();
            maze.add_node_cell(index, node, &node_ports);
        }
        for &guide in guides {
            maze.add_guide_cell(guide);
        }
        maze
    }

    fn link_vertices(&mut self) {
        let cols = self.xs.len();
        let rows = self.ys.len();
        self.vertices = Vec::with_capacity(cols * rows);
        for iy in 0..rows {
            for ix in 0..cols {
                let mut links = [None; 4];
                if ix > 0 {
                    links[Dir::Left.index()] = Some(VertexId(iy * cols + ix - 1));
                }
                if ix + 1 < cols {
                    links[Dir::Right.index()] = Some(VertexId(iy * cols + ix + 1));
                }
                if iy > 0 {
                    links[Dir::Up.index()] = Some(VertexId((iy - 1) * cols + ix));
                }
                if iy + 1 < rows {
                    links[Dir::Down.index()] = Some(VertexId((iy + 1) * cols + ix));
                }
                self.vertices.push(GridVertex {
                    x: self.xs[ix],
                    y: self.ys[iy],
                    links,
                    internal: None,
                });
            }
        }
    }

    fn add_node_cell(&mut self, index: usize, node: &NodeLayout, ports: &[RoutePort]) {
        let cell_id = CellId(self.cells.len());
        let visible = node.visible_rect();
        let obstacle = node.obstacle_rect();
        let center = node.center();
        let cols = self.xs.len();
        let mut axis_vertices = Vec::new();

        for iy in lines_within(&self.ys, obstacle.top, obstacle.bottom) {
            for ix in lines_within(&self.xs, obstacle.left, obstacle.right) {
                let id = VertexId(iy * cols + ix);
                if self.vertices[id.0].internal.is_some() {
                    // Overlapping boxes: the earlier node keeps the vertex.
                    continue;
                }
                let point = self.vertices[id.0].point();
                let on_center_x = (point.0 - center.0).abs() <= EPS;
                let on_center_y = (point.1 - center.1).abs() <= EPS;
                let mut exits = ExitSet::default();
                if !(on_center_x && on_center_y) {
                    if on_center_y {
                        exits.insert(if point.0 < center.0 { Dir::Left } else { Dir::Right });
                    }
                    if on_center_x {
                        exits.insert(if point.1 < center.1 { Dir::Up } else { Dir::Down });
                    }
                    for port in ports {
                        if let RoutePort::Side { side, point: port_point } = *port {
                            if port_line_reaches(side, port_point, center, point) {
                                exits.insert(side.outward());
                            }
                        }
                    }
                }
                self.vertices[id.0].internal = Some(InternalMark {
                    cell: cell_id,
                    exits,
                });
                if exits.is_empty() && !(on_center_x && on_center_y) {
                    self.isolate(id);
                } else {
                    axis_vertices.push(id);
                }
            }
        }

        let center_vertex = self
            .vertex_at(center.0, center.1)
            .filter(|id| self.internal_cell(*id) == Some(cell_id));
        self.cells.push(Cell {
            kind: CellKind::Node(index),
            visible,
            obstacle,
            center,
            center_vertex,
            axis_vertices,
        });
        self.node_cells[index] = Some(cell_id);
    }

    fn add_guide_cell(&mut self, point: (f32, f32)) {
        if self.guide_cell(point).is_some() {
            return;
        }
        let rect = Rect {
            left: point.0,
            top: point.1,
            right: point.0,
            bottom: point.1,
        };
        let vertex = self.vertex_at(point.0, point.1);
        let id = CellId(self.cells.len());
        self.cells.push(Cell {
            kind: CellKind::Guide,
            visible: rect,
            obstacle: rect,
            center: point,
            center_vertex: vertex,
            axis_vertices: vertex.into_iter().collect(),
        });
        self.guide_cells.push((point, id));
    }

    fn isolate(&mut self, id: VertexId) {
        for dir in Dir::ALL {
            if let Some(other) = self.vertices[id.0].links[dir.index()].take() {
                self.vertices[other.0].links[dir.opposite().index()] = None;
            }
        }
    }

    pub fn vertex(&self, id: VertexId) -> Option<&GridVertex> {
        self.vertices.get(id.0)
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.0)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_at(&self, x: f32, y: f32) -> Option<VertexId> {
        let ix = find_line(&self.xs, x)?;
        let iy = find_line(&self.ys, y)?;
        Some(VertexId(iy * self.xs.len() + ix))
    }

    pub fn node_cell(&self, node_index: usize) -> Option<CellId> {
        self.node_cells.get(node_index).copied().flatten()
    }

    pub fn guide_cell(&self, point: (f32, f32)) -> Option<CellId> {
        self.guide_cells
            .iter()
            .find(|(p, _)| (p.0 - point.0).abs() <= EPS && (p.1 - point.1).abs() <= EPS)
            .map(|(_, id)| *id)
    }

    pub fn internal_cell(&self, id: VertexId) -> Option<CellId> {
        self.vertices
            .get(id.0)
            .and_then(|vertex| vertex.internal)
            .map(|mark| mark.cell)
    }

    pub fn canvas(&self) -> Option<Rect> {
        self.canvas
    }

    /// Boundary lines enclosing `axis`: the largest strictly below and the
    /// smallest strictly above. Horizontal segments are bracketed by y lines.
    pub fn channel_bracket(&self, axis: f32, is_hor: bool) -> Option<(f32, f32)> {
        let lines = if is_hor { &self.bounds_y } else { &self.bounds_x };
        let below = lines.partition_point(|line| *line < axis - EPS);
        let above = lines.partition_point(|line| *line <= axis + EPS);
        let min = *lines.get(below.checked_sub(1)?)?;
        let max = *lines.get(above)?;
        Some((min, max))
    }
}

/// Whether a side port's stub line passes through `point` on its way from
/// the node center to the port's side.
fn port_line_reaches(side: EdgeSide, port: (f32, f32), center: (f32, f32), point: (f32, f32)) -> bool {
    match side {
        EdgeSide::Top => (point.0 - port.0).abs() <= EPS && point.1 <= center.1 + EPS,
        EdgeSide::Bottom => (point.0 - port.0).abs() <= EPS && point.1 >= center.1 - EPS,
        EdgeSide::Left => (point.1 - port.1).abs() <= EPS && point.0 <= center.0 + EPS,
        EdgeSide::Right => (point.1 - port.1).abs() <= EPS && point.0 >= center.0 - EPS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Margins;

    fn make_node(id: &str, cx: f32, cy: f32, w: f32, h: f32) -> NodeLayout {
        NodeLayout {
            id: id.to_string(),
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            width: w,
            height: h,
            margin: Margins::default(),
            cluster: None,
            is_virtual: false,
        }
    }

    #[test]
    fn grid_lines_sit_between_boundaries() {
        let nodes = vec![
            make_node("a", 0.0, 0.0, 2.0, 2.0),
            make_node("b", 10.0, 0.0, 2.0, 2.0),
        ];
        let maze = Maze::build(&nodes, &[], &[], &[], 18.0);
        assert_eq!(maze.xs, vec![-10.0, 0.0, 5.0, 10.0, 20.0]);
        assert_eq!(maze.ys, vec![-10.0, 0.0, 10.0]);
        let mid = maze.vertex_at(5.0, 0.0).unwrap();
        assert!(maze.vertex(mid).unwrap().internal.is_none());
    }

    #[test]
    fn center_vertex_has_no_exit_restriction() {
        let nodes = vec![make_node("a", 0.0, 0.0, 20.0, 10.0)];
        let maze = Maze::build(&nodes, &[], &[], &[], 18.0);
        let cell_id = maze.node_cell(0).unwrap();
        let cell = maze.cell(cell_id).unwrap();
        let center = cell.center_vertex.unwrap();
        let mark = maze.vertex(center).unwrap().internal.unwrap();
        assert_eq!(mark.cell, cell_id);
        assert!(mark.exits.is_empty());
    }

    #[test]
    fn port_line_exit_points_outward() {
        let nodes = vec![make_node("a", 0.0, 0.0, 20.0, 10.0)];
        let port = RoutePort::Side {
            side: EdgeSide::Top,
            point: (5.0, -5.0),
        };
        let maze = Maze::build(&nodes, &[], &[(0, port)], &[], 18.0);
        let on_port = maze.vertex_at(5.0, 0.0).unwrap();
        let mark = maze.vertex(on_port).unwrap().internal.unwrap();
        assert!(mark.exits.contains(Dir::Up));
        assert!(mark.exits.contains(Dir::Right));
        assert!(!mark.exits.contains(Dir::Down));
    }

    #[test]
    fn internal_vertices_off_axis_are_pruned() {
        let nodes = vec![make_node("a", 0.0, 0.0, 20.0, 10.0)];
        let ports = [
            (
                0,
                RoutePort::Side {
                    side: EdgeSide::Top,
                    point: (5.0, -5.0),
                },
            ),
            (
                0,
                RoutePort::Side {
                    side: EdgeSide::Left,
                    point: (-10.0, 2.0),
                },
            ),
        ];
        let maze = Maze::build(&nodes, &[], &ports, &[], 18.0);
        // (0, 2) lies on the center column and the left port row.
        let kept = maze.vertex_at(0.0, 2.0).unwrap();
        let kept_mark = maze.vertex(kept).unwrap().internal.unwrap();
        assert!(kept_mark.exits.contains(Dir::Left));
        assert!(kept_mark.exits.contains(Dir::Down));
        // (5, 2) is below the top port's stub and right of the left one.
        let pruned = maze.vertex_at(5.0, 2.0).unwrap();
        let vertex = maze.vertex(pruned).unwrap();
        assert!(vertex.internal.unwrap().exits.is_empty());
        assert!(vertex.links.iter().all(Option::is_none));
        let cell = maze.cell(maze.node_cell(0).unwrap()).unwrap();
        assert!(!cell.axis_vertices.contains(&pruned));
    }

    #[test]
    fn bracket_uses_nearest_boundaries() {
        let nodes = vec![
            make_node("a", 0.0, 0.0, 2.0, 2.0),
            make_node("c", 0.0, 5.0, 4.0, 4.0),
        ];
        let maze = Maze::build(&nodes, &[], &[], &[], 18.0);
        assert_eq!(maze.channel_bracket(11.0, false), Some((2.0, 20.0)));
        assert_eq!(maze.channel_bracket(0.0, true), Some((-1.0, 1.0)));
        assert_eq!(maze.channel_bracket(100.0, false), None);
    }

    #[test]
    fn virtual_nodes_have_no_cell() {
        let mut hidden = make_node("v", 0.0, 0.0, 2.0, 2.0);
        hidden.is_virtual = true;
        let nodes = vec![make_node("a", 10.0, 0.0, 2.0, 2.0), hidden];
        let maze = Maze::build(&nodes, &[], &[], &[], 18.0);
        assert!(maze.node_cell(0).is_some());
        assert!(maze.node_cell(1).is_none());
    }

    #[test]
    fn guide_points_become_cells() {
        let nodes = vec![make_node("a", 0.0, 0.0, 2.0, 2.0)];
        let maze = Maze::build(&nodes, &[], &[], &[(10.0, 8.0)], 18.0);
        let guide = maze.guide_cell((10.0, 8.0)).unwrap();
        let cell = maze.cell(guide).unwrap();
        assert_eq!(cell.kind, CellKind::Guide);
        assert_eq!(cell.center_vertex, maze.vertex_at(10.0, 8.0));
    }
}
