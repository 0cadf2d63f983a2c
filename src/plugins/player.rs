// Keyboard-driven capsule character. Intent maps to a linear velocity on the
// rigid body (the physics engine owns integration and collision response);
// the visual child yaws smoothly toward the movement heading.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::f32::consts::{PI, TAU};

pub const WALK_SPEED: f32 = 2.0;
pub const RUN_SPEED: f32 = 6.0;

#[derive(Component)]
pub struct Player;

/// Child mesh that rotates toward the heading (the body itself has locked
/// rotations).
#[derive(Component)]
pub struct PlayerVisual;

pub struct PlayerPlugin;
impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_player)
            .add_systems(Update, drive_player);
    }
}

fn spawn_player(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands
        .spawn((
            RigidBody::Dynamic,
            LockedAxes::ROTATION_LOCKED,
            Collider::capsule_y(0.54, 0.2),
            Velocity::zero(),
            SpatialBundle::from_transform(Transform::from_xyz(0.0, 1.0, -15.0)),
            Player,
        ))
        .with_children(|parent| {
            parent.spawn((
                PbrBundle {
                    mesh: meshes.add(Capsule3d::new(0.2, 1.08)),
                    material: materials.add(StandardMaterial {
                        base_color: Color::srgb(0.85, 0.30, 0.25),
                        perceptual_roughness: 0.8,
                        ..default()
                    }),
                    ..default()
                },
                PlayerVisual,
            ));
        });
}

/// Shortest-path angular interpolation so the character never swings the
/// long way round when the heading crosses the ±π seam.
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    let mut delta = (b - a).rem_euclid(TAU);
    if delta > PI {
        delta -= TAU;
    }
    a + delta * t
}

fn drive_player(
    keys: Res<ButtonInput<KeyCode>>,
    mut q_player: Query<&mut Velocity, With<Player>>,
    mut q_visual: Query<&mut Transform, With<PlayerVisual>>,
) {
    let Ok(mut vel) = q_player.get_single_mut() else { return };

    let forward = keys.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]) as i8
        - keys.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]) as i8;
    let side = keys.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]) as i8
        - keys.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]) as i8;
    let run = keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let speed = if run { RUN_SPEED } else { WALK_SPEED };

    let direction = Vec3::new(side as f32, 0.0, forward as f32).normalize_or_zero() * speed;
    // Preserve vertical velocity: gravity stays with the physics engine.
    vel.linvel = Vec3::new(direction.x, vel.linvel.y, direction.z);

    if direction.length_squared() > 0.0 {
        if let Ok(mut visual_t) = q_visual.get_single_mut() {
            let target = direction.x.atan2(direction.z);
            let (current, _, _) = visual_t.rotation.to_euler(EulerRot::YXZ);
            visual_t.rotation = Quat::from_rotation_y(lerp_angle(current, target, 0.1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_angle_takes_the_short_way() {
        // Crossing the seam: from just below +π to just above -π.
        let a = PI - 0.1;
        let b = -PI + 0.1;
        let mid = lerp_angle(a, b, 0.5);
        // Halfway lands on the seam, not at zero.
        assert!((mid - PI).abs() < 1e-4 || (mid + PI).abs() < 1e-4);
    }

    #[test]
    fn lerp_angle_full_step_reaches_target() {
        let got = lerp_angle(0.3, 1.1, 1.0);
        assert!((got - 1.1).abs() < 1e-6);
    }
}
