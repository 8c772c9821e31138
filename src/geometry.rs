//! Vertex data for the fixed scene drawables: the vehicle hull, the rotor
//! blades and the axis gizmo. Hull and rotor use the renderer's interleaved
//! position+normal layout; the gizmo uses position+color.

type Point = [f32; 3];

fn push_vertex(out: &mut Vec<f32>, position: Point, normal: Point) {
    out.extend_from_slice(&position);
    out.extend_from_slice(&normal);
}

/// Emits a quad as two triangles `(p0,p1,p2)` and `(p0,p2,p3)` sharing one
/// face normal.
fn push_quad(out: &mut Vec<f32>, corners: [Point; 4], normal: Point) {
    let [p0, p1, p2, p3] = corners;
    for p in [p0, p1, p2, p0, p2, p3] {
        push_vertex(out, p, normal);
    }
}

/// Vehicle hull: a box of half-extent `l` with a half-width tail boom
/// extending along +y. 22 triangles, 66 vertices.
pub fn vehicle_hull(l: f32) -> Vec<f32> {
    let h = l / 2.0;
    let t = 3.0 * l;
    let mut out = Vec::with_capacity(66 * 6);

    // Cabin box.
    push_quad(
        &mut out,
        [[l, -l, -l], [l, l, -l], [l, l, l], [l, -l, l]],
        [1.0, 0.0, 0.0],
    );
    push_quad(
        &mut out,
        [[-l, -l, -l], [l, -l, -l], [l, -l, l], [-l, -l, l]],
        [0.0, -1.0, 0.0],
    );
    push_quad(
        &mut out,
        [[l, l, -l], [-l, l, -l], [-l, l, l], [l, l, l]],
        [0.0, 1.0, 0.0],
    );
    push_quad(
        &mut out,
        [[-l, l, -l], [-l, -l, -l], [-l, -l, l], [-l, l, l]],
        [-1.0, 0.0, 0.0],
    );
    push_quad(
        &mut out,
        [[l, -l, l], [l, l, l], [-l, l, l], [-l, -l, l]],
        [0.0, 0.0, 1.0],
    );
    push_quad(
        &mut out,
        [[-l, -l, -l], [-l, l, -l], [l, l, -l], [l, -l, -l]],
        [0.0, 0.0, -1.0],
    );

    // Tail boom, spanning y in [l, 3l].
    push_quad(
        &mut out,
        [[h, l, -h], [h, t, -h], [h, t, h], [h, l, h]],
        [1.0, 0.0, 0.0],
    );
    push_quad(
        &mut out,
        [[h, t, -h], [-h, t, -h], [-h, t, h], [h, t, h]],
        [0.0, 1.0, 0.0],
    );
    push_quad(
        &mut out,
        [[-h, t, -h], [-h, l, -h], [-h, l, h], [-h, t, h]],
        [-1.0, 0.0, 0.0],
    );
    push_quad(
        &mut out,
        [[h, l, h], [h, t, h], [-h, t, h], [-h, l, h]],
        [0.0, 0.0, 1.0],
    );
    push_quad(
        &mut out,
        [[-h, l, -h], [-h, t, -h], [h, t, -h], [h, l, -h]],
        [0.0, 0.0, -1.0],
    );

    out
}

/// Rotor: four triangular blades in the plane z = l + l/4, all facing +z.
/// 12 vertices.
pub fn rotor_blades(l: f32) -> Vec<f32> {
    let z = l + l / 4.0;
    let half = l / 2.0;
    let reach = 3.0 * l / 2.0;
    let mut out = Vec::with_capacity(12 * 6);
    let up = [0.0, 0.0, 1.0];

    let blades: [[Point; 3]; 4] = [
        [[0.0, 0.0, z], [-half, -reach, z], [half, -reach, z]],
        [[0.0, 0.0, z], [reach, -half, z], [reach, half, z]],
        [[0.0, 0.0, z], [half, reach, z], [-half, reach, z]],
        [[0.0, 0.0, z], [-reach, half, z], [-reach, -half, z]],
    ];
    for blade in blades {
        for p in blade {
            push_vertex(&mut out, p, up);
        }
    }
    out
}

/// Axis gizmo: three colored line segments from the origin (x red, y green,
/// z blue), interleaved position+color.
pub fn axis_gizmo(length: f32) -> Vec<f32> {
    let l = length;
    vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, //
        l, 0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
        0.0, l, 0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
        0.0, 0.0, l, 0.0, 0.0, 1.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hull_has_sixty_six_vertices() {
        let hull = vehicle_hull(0.1);
        assert_eq!(hull.len(), 66 * 6);
    }

    #[test]
    fn hull_normals_are_axis_aligned_units() {
        for vertex in vehicle_hull(0.1).chunks(6) {
            let n = glam::Vec3::new(vertex[3], vertex[4], vertex[5]);
            assert!((n.length() - 1.0).abs() < 1e-6);
            assert_eq!(n.abs().max_element(), 1.0);
        }
    }

    #[test]
    fn tail_extends_three_half_extents_along_y() {
        let max_y = vehicle_hull(0.1)
            .chunks(6)
            .map(|v| v[1])
            .fold(f32::MIN, f32::max);
        assert!((max_y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn rotor_lies_in_one_plane_above_the_hull() {
        let blades = rotor_blades(0.1);
        assert_eq!(blades.len(), 12 * 6);
        for vertex in blades.chunks(6) {
            assert!((vertex[2] - 0.125).abs() < 1e-6);
            assert_eq!(&vertex[3..6], &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn gizmo_axes_carry_their_colors() {
        let gizmo = axis_gizmo(2.0);
        assert_eq!(gizmo.len(), 6 * 6);
        // Tip of the x axis is red.
        assert_eq!(&gizmo[6..12], &[2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        // Tip of the z axis is blue.
        assert_eq!(&gizmo[30..36], &[0.0, 0.0, 2.0, 0.0, 0.0, 1.0]);
    }
}
