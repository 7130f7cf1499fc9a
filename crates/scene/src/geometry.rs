//! Box wireframe geometry.

use glam::Vec3;

/// Endpoint pairs for the 12 edges of a unit box centered at the origin,
/// expressed as corner signs. Consecutive points form one line segment.
const UNIT_EDGES: [[f32; 3]; 24] = [
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, -1.0, -1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0],
];

/// Line-segment endpoints for the wireframe of an axis-aligned box.
///
/// Returns 24 points forming 12 segments, ready for the viewer's
/// line-segment draw call: each unit corner is scaled by half the extents
/// and offset by the center.
pub fn wireframe_edges(center: Vec3, extents: Vec3) -> [Vec3; 24] {
    let half = extents / 2.0;
    UNIT_EDGES.map(|corner| Vec3::from_array(corner) * half + center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_span_the_box() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let extents = Vec3::new(2.0, 4.0, 6.0);
        let points = wireframe_edges(center, extents);

        let min = points.iter().copied().reduce(Vec3::min).unwrap();
        let max = points.iter().copied().reduce(Vec3::max).unwrap();
        assert_eq!(min, center - extents / 2.0);
        assert_eq!(max, center + extents / 2.0);
    }

    #[test]
    fn segments_have_unit_box_topology() {
        let points = wireframe_edges(Vec3::ZERO, Vec3::splat(2.0));
        // 12 segments, each axis-aligned with length equal to one extent.
        for pair in points.chunks_exact(2) {
            let delta = (pair[1] - pair[0]).abs();
            let axes = [delta.x, delta.y, delta.z];
            assert_eq!(axes.iter().filter(|&&d| d > 0.0).count(), 1);
            assert_eq!(axes.iter().copied().fold(0.0, f32::max), 2.0);
        }
    }
}
