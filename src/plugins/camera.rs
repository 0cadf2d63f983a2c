use bevy::prelude::*;

use crate::plugins::player::Player;

/// Marker for the single follow camera. Its world position is the viewer
/// position the grass LOD classifier reads every frame.
#[derive(Component)]
pub struct FollowCamera;

/// Follow behavior constants (world-space offsets from the character).
#[derive(Resource)]
pub struct FollowCameraConfig {
    /// Where the camera wants to sit, relative to the character.
    pub pivot_offset: Vec3,
    /// Look-at point, relative to the character.
    pub target_offset: Vec3,
    /// Per-frame lerp factor toward the pivot.
    pub chase_factor: f32,
}

impl Default for FollowCameraConfig {
    fn default() -> Self {
        Self {
            pivot_offset: Vec3::new(0.0, 3.0, -4.0),
            target_offset: Vec3::new(0.0, 1.2, 0.0),
            chase_factor: 0.1,
        }
    }
}

pub struct FollowCameraPlugin;
impl Plugin for FollowCameraPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(FollowCameraConfig::default())
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, follow_player);
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_xyz(10.0, 3.5, 0.0).looking_at(Vec3::ZERO, Vec3::Y),
            projection: PerspectiveProjection {
                fov: 60f32.to_radians(),
                ..default()
            }
            .into(),
            ..default()
        },
        FollowCamera,
    ));
}

/// Smoothed chase toward a pivot behind/above the character, always looking
/// at a point just over its head.
fn follow_player(
    cfg: Res<FollowCameraConfig>,
    q_player: Query<&Transform, (With<Player>, Without<FollowCamera>)>,
    mut q_cam: Query<&mut Transform, With<FollowCamera>>,
) {
    let Ok(player_t) = q_player.get_single() else { return };
    let Ok(mut cam_t) = q_cam.get_single_mut() else { return };

    let pivot = player_t.translation + cfg.pivot_offset;
    cam_t.translation = cam_t.translation.lerp(pivot, cfg.chase_factor);
    let look_at = player_t.translation + cfg.target_offset;
    cam_t.look_at(look_at, Vec3::Y);
}
