/// Cubic Bezier control polygons for `count` edges between the same two
/// points, fanned symmetrically around the chord. Curve `i` bulges
/// `(i - (count - 1) / 2) * spacing` to the left of `from -> to`; with an
/// odd count the middle curve lies on the chord.
pub fn symmetry_parallel_line(
    from: (f32, f32),
    to: (f32, f32),
    count: usize,
    spacing: f32,
) -> Vec<[(f32, f32); 4]> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if len > f32::EPSILON {
        (-dy / len, dx / len)
    } else {
        (0.0, -1.0)
    };
    let center = (count as f32 - 1.0) / 2.0;
    (0..count)
        .map(|i| {
            let offset = (i as f32 - center) * spacing;
            // A cubic peaks at 3/4 of its control offset.
            let push = offset * 4.0 / 3.0;
            [
                from,
                (from.0 + dx / 3.0 + nx * push, from.1 + dy / 3.0 + ny * push),
                (
                    from.0 + dx * 2.0 / 3.0 + nx * push,
                    from.1 + dy * 2.0 / 3.0 + ny * push,
                ),
                to,
            ]
        })
        .collect()
}

/// Signed perpendicular distance of `point` from the line `from -> to`.
pub fn chord_offset(from: (f32, f32), to: (f32, f32), point: (f32, f32)) -> f32 {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON {
        return 0.0;
    }
    ((point.0 - from.0) * -dy + (point.1 - from.1) * dx) / len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::routing::bezier_point;

    #[test]
    fn three_curves_are_symmetric() {
        let curves = symmetry_parallel_line((0.0, 0.0), (30.0, 0.0), 3, 9.0);
        assert_eq!(curves.len(), 3);
        let offsets: Vec<f32> = curves
            .iter()
            .map(|c| chord_offset((0.0, 0.0), (30.0, 0.0), c[1]))
            .collect();
        assert!(offsets[1].abs() < 1e-5);
        assert!((offsets[0] + offsets[2]).abs() < 1e-5);
        assert!(offsets[0] != offsets[2]);
        let peak = bezier_point(&curves[2], 0.5);
        assert!((chord_offset((0.0, 0.0), (30.0, 0.0), peak) - 9.0).abs() < 1e-4);
    }

    #[test]
    fn even_fan_has_no_center_curve() {
        let curves = symmetry_parallel_line((0.0, 0.0), (0.0, 20.0), 2, 6.0);
        let a = chord_offset((0.0, 0.0), (0.0, 20.0), curves[0][1]);
        let b = chord_offset((0.0, 0.0), (0.0, 20.0), curves[1][2]);
        assert!((a + 4.0).abs() < 1e-5);
        assert!((b - 4.0).abs() < 1e-5);
    }

    #[test]
    fn endpoints_stay_on_centers() {
        let curves = symmetry_parallel_line((1.0, 2.0), (7.0, 9.0), 4, 3.0);
        for curve in curves {
            assert_eq!(curve[0], (1.0, 2.0));
            assert_eq!(curve[3], (7.0, 9.0));
        }
    }
}
