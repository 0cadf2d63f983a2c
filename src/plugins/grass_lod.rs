// Per-frame LOD classification: the algorithmic core.
//
// Every rendered frame the full instance field is scanned in index order;
// each blade's distance to the camera decides its tier, its world transform
// is appended to that tier's transform buffer, and both buffers get fresh
// active counts. Brute force by design: a linear scan over a flat array
// holds up well into the 10^5..10^6 range, and the contract (two
// count-bounded transform arrays) would let a spatial grid slot in later
// without API changes.

use bevy::prelude::*;
use bevy::render::view::NoFrustumCulling;
use serde::Deserialize;

use crate::plugins::blade_geometry::{build_blade_mesh, BladeParams, HIGH_DETAIL, LOW_DETAIL};
use crate::plugins::camera::FollowCamera;
use crate::plugins::grass_instancing::{GrassInstanceData, GrassTierInstances};
use crate::plugins::instance_field::{BladeInstance, InstanceField};

/// Construction-time configuration. Not runtime-mutable: changing `count` or
/// `field_size` means rebuilding the field.
#[derive(Resource, Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct GrassConfig {
    /// Total blade instances across both tiers.
    pub count: usize,
    /// Side length of the square placement patch.
    pub field_size: f32,
    /// Uniform scale applied to every blade transform.
    pub blade_scale: f32,
    /// Camera distance below which a blade renders at full tessellation.
    pub lod_distance: f32,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            count: 200_000,
            field_size: 60.0,
            blade_scale: 0.8,
            lod_distance: 20.0,
        }
    }
}

const SETTINGS_PATH: &str = "assets/settings/grass.ron";

fn load_config(mut commands: Commands) {
    #[cfg(target_arch = "wasm32")]
    let data = Some(include_str!("../../assets/settings/grass.ron").to_string());
    #[cfg(not(target_arch = "wasm32"))]
    let data = std::fs::read_to_string(SETTINGS_PATH).ok();

    let cfg = match data.as_deref().map(ron::from_str::<GrassConfig>) {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            warn!("GRASS settings parse failed path={SETTINGS_PATH} error={e}; using defaults");
            GrassConfig::default()
        }
        None => {
            warn!("GRASS settings missing path={SETTINGS_PATH}; using defaults");
            GrassConfig::default()
        }
    };
    info!(
        "GRASS config count={} field_size={} blade_scale={} lod_distance={}",
        cfg.count, cfg.field_size, cfg.blade_scale, cfg.lod_distance
    );
    commands.insert_resource(cfg);
}

/// Detail tier marker on the two render-node entities.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub enum GrassTier {
    /// Near the camera: full tessellation.
    High,
    /// Far from the camera: single-triangle blades.
    Low,
}

impl GrassTier {
    pub fn blade_params(self) -> BladeParams {
        match self {
            GrassTier::High => HIGH_DETAIL,
            GrassTier::Low => LOW_DETAIL,
        }
    }
}

pub struct GrassLodPlugin;
impl Plugin for GrassLodPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_config)
            .add_systems(Startup, spawn_render_tiers)
            .add_systems(
                Update,
                // Uniform updates happen-before classification within the frame.
                classify_instances.after(crate::plugins::grass_shading::sync_tuning),
            );
    }
}

fn spawn_render_tiers(
    mut commands: Commands,
    cfg: Res<GrassConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for tier in [GrassTier::High, GrassTier::Low] {
        commands.spawn((
            meshes.add(build_blade_mesh(&tier.blade_params())),
            SpatialBundle::INHERITED_IDENTITY,
            tier,
            // Each tier can hold the whole field in the worst case.
            GrassTierInstances::with_capacity(cfg.count),
            // Instances live far outside the base blade AABB.
            NoFrustumCulling,
        ));
    }
}

/// Classification core, separated from the ECS for testability. Scans the
/// field in index order (draw order within a tier follows field order) and
/// appends each world transform to its tier bucket.
pub fn classify_field(
    field: &[BladeInstance],
    viewer: Vec3,
    lod_distance: f32,
    blade_scale: f32,
    high: &mut GrassTierInstances,
    low: &mut GrassTierInstances,
) {
    high.clear();
    low.clear();

    let scale = Vec3::splat(blade_scale);
    for inst in field {
        let translation = Vec3::new(inst.x, 0.0, inst.z);
        // Full 3D distance: the camera's height participates on purpose.
        let d = translation.distance(viewer);
        let transform = Mat4::from_scale_rotation_translation(
            scale,
            Quat::from_rotation_y(inst.yaw),
            translation,
        );
        let bucket = if d < lod_distance { &mut *high } else { &mut *low };
        bucket.push(GrassInstanceData::new(transform));
    }

    high.mark_dirty();
    low.mark_dirty();
}

/// Per-frame entry point. Silent no-op while the field is still generating,
/// before the camera exists, or before the tier entities are spawned;
/// classification resumes on the first frame everything is ready.
pub fn classify_instances(
    cfg: Res<GrassConfig>,
    field: Option<Res<InstanceField>>,
    q_cam: Query<&GlobalTransform, With<FollowCamera>>,
    mut q_tiers: Query<(&GrassTier, &mut GrassTierInstances)>,
) {
    let Some(field) = field else { return };
    let Ok(cam) = q_cam.get_single() else { return };

    let mut high = None;
    let mut low = None;
    for (tier, instances) in q_tiers.iter_mut() {
        match tier {
            GrassTier::High => high = Some(instances),
            GrassTier::Low => low = Some(instances),
        }
    }
    let (Some(mut high), Some(mut low)) = (high, low) else { return };

    classify_field(
        field.instances(),
        cam.translation(),
        cfg.lod_distance,
        cfg.blade_scale,
        &mut high,
        &mut low,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiers(capacity: usize) -> (GrassTierInstances, GrassTierInstances) {
        (
            GrassTierInstances::with_capacity(capacity),
            GrassTierInstances::with_capacity(capacity),
        )
    }

    #[test]
    fn partition_is_complete() {
        let field =
            InstanceField::generate(1000, 60.0, &mut StdRng::seed_from_u64(11));
        let (mut high, mut low) = tiers(1000);
        classify_field(field.instances(), Vec3::new(3.0, 2.0, -5.0), 20.0, 0.8, &mut high, &mut low);
        assert_eq!(high.active() + low.active(), 1000);
        assert!(high.is_dirty() && low.is_dirty());
    }

    #[test]
    fn tiers_respect_the_distance_threshold() {
        let viewer = Vec3::new(1.0, 3.5, -2.0);
        let lod_distance = 20.0;
        let field =
            InstanceField::generate(2000, 60.0, &mut StdRng::seed_from_u64(23));
        let (mut high, mut low) = tiers(2000);
        classify_field(field.instances(), viewer, lod_distance, 0.8, &mut high, &mut low);

        for data in high.as_slice() {
            let pos = data.model().w_axis.truncate();
            assert!(pos.distance(viewer) < lod_distance);
        }
        for data in low.as_slice() {
            let pos = data.model().w_axis.truncate();
            assert!(pos.distance(viewer) >= lod_distance);
        }
    }

    #[test]
    fn four_instance_threshold_scenario() {
        // Distances from the origin viewer: 2, 6, 4.9, 5.1 against a
        // threshold of 5.
        let field = InstanceField::from_instances(vec![
            BladeInstance { x: 2.0, z: 0.0, yaw: 0.0 },
            BladeInstance { x: 0.0, z: 6.0, yaw: 0.0 },
            BladeInstance { x: 4.9, z: 0.0, yaw: 0.0 },
            BladeInstance { x: 0.0, z: 5.1, yaw: 0.0 },
        ]);
        let (mut high, mut low) = tiers(4);
        classify_field(field.instances(), Vec3::ZERO, 5.0, 0.8, &mut high, &mut low);
        assert_eq!(high.active(), 2);
        assert_eq!(low.active(), 2);
    }

    #[test]
    fn empty_field_yields_two_empty_tiers() {
        let field = InstanceField::from_instances(Vec::new());
        let (mut high, mut low) = tiers(0);
        classify_field(field.instances(), Vec3::ZERO, 20.0, 0.8, &mut high, &mut low);
        assert_eq!(high.active(), 0);
        assert_eq!(low.active(), 0);
    }

    #[test]
    fn overflowing_tier_drops_silently() {
        let field = InstanceField::from_instances(vec![
            BladeInstance { x: 1.0, z: 0.0, yaw: 0.0 },
            BladeInstance { x: 2.0, z: 0.0, yaw: 0.0 },
            BladeInstance { x: 3.0, z: 0.0, yaw: 0.0 },
        ]);
        let (mut high, mut low) = tiers(1);
        classify_field(field.instances(), Vec3::ZERO, 100.0, 0.8, &mut high, &mut low);
        assert_eq!(high.active(), 1);
        assert_eq!(low.active(), 0);
    }

    #[test]
    fn transforms_follow_field_order() {
        let field = InstanceField::from_instances(vec![
            BladeInstance { x: 1.0, z: 0.0, yaw: 0.0 },
            BladeInstance { x: 2.0, z: 0.0, yaw: 0.0 },
        ]);
        let (mut high, mut low) = tiers(2);
        classify_field(field.instances(), Vec3::ZERO, 100.0, 1.0, &mut high, &mut low);
        let xs: Vec<f32> = high.as_slice().iter().map(|d| d.model().w_axis.x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn transform_composition_matches_contract() {
        // Translate, then yaw, then uniform scale applied to the blade.
        let field = InstanceField::from_instances(vec![BladeInstance {
            x: 3.0,
            z: -4.0,
            yaw: 1.0,
        }]);
        let (mut high, mut low) = tiers(1);
        classify_field(field.instances(), Vec3::ZERO, 100.0, 0.8, &mut high, &mut low);
        let m = high.as_slice()[0].model();
        let expected = Mat4::from_scale_rotation_translation(
            Vec3::splat(0.8),
            Quat::from_rotation_y(1.0),
            Vec3::new(3.0, 0.0, -4.0),
        );
        assert_eq!(m, expected);
    }
}
