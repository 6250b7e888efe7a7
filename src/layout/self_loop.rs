use crate::ir::Margins;

use super::routing::bezier_point;
use super::types::NodeLayout;

/// Clearance a node needs on its right and top sides to host its loops.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrthoNodeSizeExpander {
    pub right: f32,
    pub top: f32,
}

impl OrthoNodeSizeExpander {
    /// Grows the routing margin so other edges keep clear of the loops.
    pub fn apply(&self, margin: &mut Margins) {
        margin.right = margin.right.max(self.right);
        margin.top = margin.top.max(self.top);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfLoop {
    pub edge_index: usize,
    pub points: Vec<(f32, f32)>,
    pub curved: bool,
    pub label_anchor: (f32, f32),
}

/// Nested loops leaving the right side and returning through the top.
/// `loops` holds `(edge index, label width)` in drawing order; loop `i` sits
/// inside loop `i + 1`.
pub fn layout_self_loops(
    node: &NodeLayout,
    loops: &[(usize, f32)],
    unit: f32,
    curved: bool,
) -> (OrthoNodeSizeExpander, Vec<SelfLoop>) {
    let count = loops.len();
    if count == 0 {
        return (OrthoNodeSizeExpander::default(), Vec::new());
    }
    let rect = node.visible_rect();
    let slots = count as f32 + 1.0;
    let mut gap = 0.0;
    let mut expander = OrthoNodeSizeExpander::default();
    let mut out = Vec::with_capacity(count);

    for (i, &(edge_index, label_width)) in loops.iter().enumerate() {
        let step = (i + 1) as f32;
        let y = rect.top + rect.height() * step / slots;
        let x = rect.right - rect.width() * step / slots;
        gap += unit + label_width.max(0.0);
        let top_gap = unit * step;
        let outer_x = rect.right + gap;
        let outer_y = rect.top - top_gap;

        let (points, label_anchor) = if curved {
            let control = [
                (rect.right, y),
                (rect.right + gap * 4.0 / 3.0, y),
                (x, rect.top - top_gap * 4.0 / 3.0),
                (x, rect.top),
            ];
            (control.to_vec(), bezier_point(&control, 0.5))
        } else {
            let points = vec![
                (rect.right, y),
                (outer_x, y),
                (outer_x, outer_y),
                (x, outer_y),
                (x, rect.top),
            ];
            (points, (outer_x - label_width / 2.0, (y + outer_y) / 2.0))
        };
        out.push(SelfLoop {
            edge_index,
            points,
            curved,
            label_anchor,
        });
        expander.right = gap;
        expander.top = top_gap;
    }
    (expander, out)
}
