// Procedural blade geometry: a tapered ribbon of stacked quads capped by a
// terminal triangle converging to the tip. Built once per tessellation level
// at startup and shared read-only by every instance of that tier.

use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;

/// Tessellation parameters for one blade geometry level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BladeParams {
    /// Vertical bands. Must be >= 1; a single segment degenerates to the
    /// terminal triangle alone (the minimal far-tier blade).
    pub segments: u32,
    pub half_width: f32,
    pub height: f32,
    /// Linear half-width reduction per band.
    pub taper: f32,
}

/// Near-tier blade: full tessellation.
pub const HIGH_DETAIL: BladeParams = BladeParams {
    segments: 7,
    half_width: 0.06,
    height: 1.0,
    taper: 0.005,
};

/// Far-tier blade: a single tapered triangle.
pub const LOW_DETAIL: BladeParams = BladeParams {
    segments: 1,
    half_width: 0.06,
    height: 1.0,
    taper: 0.005,
};

/// Positions emitted for `segments` bands: two triangles per lower band plus
/// the cap.
pub fn blade_vertex_count(segments: u32) -> usize {
    (6 * (segments - 1) + 3) as usize
}

/// Raw position list for one blade, as a flat (non-indexed) triangle list.
/// Deterministic: identical parameters produce bit-identical output.
pub fn blade_positions(params: &BladeParams) -> Vec<[f32; 3]> {
    let segs = params.segments.max(1);
    let mut positions = Vec::with_capacity(blade_vertex_count(segs));

    for i in 0..segs - 1 {
        let y0 = i as f32 / segs as f32 * params.height;
        let y1 = (i + 1) as f32 / segs as f32 * params.height;
        let w0 = params.half_width - params.taper * i as f32;
        let w1 = params.half_width - params.taper * (i + 1) as f32;
        positions.extend_from_slice(&[
            [-w0, y0, 0.0],
            [w0, y0, 0.0],
            [-w1, y1, 0.0],
            [-w1, y1, 0.0],
            [w0, y0, 0.0],
            [w1, y1, 0.0],
        ]);
    }

    // Cap: converge to a point at the full height.
    let top = segs - 1;
    let y = top as f32 / segs as f32 * params.height;
    let w = params.half_width - params.taper * top as f32;
    positions.extend_from_slice(&[
        [-w, y, 0.0],
        [w, y, 0.0],
        [0.0, params.height, 0.0],
    ]);

    positions
}

/// Blade mesh with face-derived flat normals. No index buffer.
pub fn build_blade_mesh(params: &BladeParams) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, blade_positions(params));
    mesh.compute_flat_normals();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_detail_vertex_count() {
        let positions = blade_positions(&HIGH_DETAIL);
        assert_eq!(positions.len(), 39);
        assert_eq!(positions.len(), blade_vertex_count(HIGH_DETAIL.segments));
    }

    #[test]
    fn single_segment_is_one_triangle() {
        let positions = blade_positions(&LOW_DETAIL);
        assert_eq!(positions.len(), 3);
        // Tip converges to (0, height, 0).
        assert_eq!(positions[2], [0.0, LOW_DETAIL.height, 0.0]);
    }

    #[test]
    fn vertex_count_formula_holds_across_resolutions() {
        for segments in 1..=12 {
            let params = BladeParams { segments, ..HIGH_DETAIL };
            assert_eq!(blade_positions(&params).len(), blade_vertex_count(segments));
        }
    }

    #[test]
    fn geometry_is_deterministic() {
        let a = blade_positions(&HIGH_DETAIL);
        let b = blade_positions(&HIGH_DETAIL);
        assert_eq!(a.len(), b.len());
        for (va, vb) in a.iter().zip(&b) {
            for k in 0..3 {
                assert_eq!(va[k].to_bits(), vb[k].to_bits());
            }
        }
    }

    #[test]
    fn taper_narrows_upper_bands() {
        let positions = blade_positions(&HIGH_DETAIL);
        // First band bottom edge at full half-width, top band narrower.
        assert_eq!(positions[0][0], -HIGH_DETAIL.half_width);
        let cap_left = positions[positions.len() - 3][0];
        assert!(cap_left.abs() < HIGH_DETAIL.half_width);
    }

    #[test]
    fn mesh_has_flat_normals() {
        let mesh = build_blade_mesh(&HIGH_DETAIL);
        let normals = mesh.attribute(Mesh::ATTRIBUTE_NORMAL).unwrap();
        assert_eq!(normals.len(), 39);
    }
}
