// One-time randomized blade placement over the square field patch.
//
// Generating the default 200k records is cheap but not free, so it runs on
// the async compute pool and lands as a resource a frame or two after
// startup; the per-frame classifier no-ops until then.

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future::{block_on, poll_once};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::plugins::grass_lod::GrassConfig;

/// Placement record for a single blade. `y` is implicitly zero: the ground
/// is flat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BladeInstance {
    pub x: f32,
    pub z: f32,
    /// Rotation about the vertical axis, radians in [0, 2π).
    pub yaw: f32,
}

/// The immutable placement set: the single source of truth for where blades
/// stand. Length is fixed at generation and values never change; re-seeding
/// means rebuilding the whole resource.
#[derive(Resource)]
pub struct InstanceField {
    instances: Vec<BladeInstance>,
}

impl InstanceField {
    /// Samples `count` placements, x and z uniform over the field square and
    /// yaw uniform over the full turn. The caller picks the RNG: the app
    /// passes an entropy-seeded `StdRng`, tests pass a fixed-seed one for
    /// reproducibility.
    pub fn generate(count: usize, field_size: f32, rng: &mut impl Rng) -> Self {
        let half = field_size * 0.5;
        let mut instances = Vec::with_capacity(count);
        for _ in 0..count {
            instances.push(BladeInstance {
                x: rng.gen_range(-half..=half),
                z: rng.gen_range(-half..=half),
                yaw: rng.gen_range(0.0..TAU),
            });
        }
        Self { instances }
    }

    /// Field with explicit placements (fixture scenarios).
    pub fn from_instances(instances: Vec<BladeInstance>) -> Self {
        Self { instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[BladeInstance] {
        &self.instances
    }
}

#[derive(Component)]
struct FieldBuildTask(Task<InstanceField>);

pub struct InstanceFieldPlugin;
impl Plugin for InstanceFieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, start_field_build)
            .add_systems(Update, finalize_field_build);
    }
}

fn start_field_build(mut commands: Commands, cfg: Res<GrassConfig>) {
    let count = cfg.count;
    let field_size = cfg.field_size;
    let task = AsyncComputeTaskPool::get().spawn(async move {
        InstanceField::generate(count, field_size, &mut StdRng::from_entropy())
    });
    commands.spawn(FieldBuildTask(task));
}

fn finalize_field_build(mut commands: Commands, mut q_tasks: Query<(Entity, &mut FieldBuildTask)>) {
    for (e, mut build) in q_tasks.iter_mut() {
        if let Some(field) = block_on(poll_once(&mut build.0)) {
            info!("GRASS field ready count={}", field.len());
            commands.insert_resource(field);
            commands.entity(e).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn field_has_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let field = InstanceField::generate(1000, 60.0, &mut rng);
        assert_eq!(field.len(), 1000);
    }

    #[test]
    fn placements_stay_inside_the_field() {
        let mut rng = StdRng::seed_from_u64(7);
        let size = 60.0;
        let field = InstanceField::generate(5000, size, &mut rng);
        for inst in field.instances() {
            assert!(inst.x.abs() <= size * 0.5);
            assert!(inst.z.abs() <= size * 0.5);
            assert!(inst.yaw >= 0.0 && inst.yaw < TAU);
        }
    }

    #[test]
    fn empty_field_is_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        let field = InstanceField::generate(0, 60.0, &mut rng);
        assert!(field.is_empty());
    }

    #[test]
    fn same_seed_reproduces_the_layout() {
        let a = InstanceField::generate(64, 10.0, &mut StdRng::seed_from_u64(42));
        let b = InstanceField::generate(64, 10.0, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.instances(), b.instances());
    }
}
