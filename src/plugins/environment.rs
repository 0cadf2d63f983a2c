// World dressing: the flat ground patch the field sits on, plus
// sunset-style lighting.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

const GROUND_HALF_EXTENT: f32 = 50.0;

pub struct EnvironmentPlugin;
impl Plugin for EnvironmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_environment);
    }
}

fn spawn_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Ground plane. The collider sits entirely below y = 0 so blade roots
    // rest exactly on the surface.
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(
                Plane3d::default()
                    .mesh()
                    .size(GROUND_HALF_EXTENT * 2.0, GROUND_HALF_EXTENT * 2.0),
            ),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb_u8(0x78, 0x62, 0x3b),
                perceptual_roughness: 0.95,
                ..default()
            }),
            ..default()
        },
        RigidBody::Fixed,
        Collider::compound(vec![(
            Vec3::new(0.0, -0.1, 0.0),
            Quat::IDENTITY,
            Collider::cuboid(GROUND_HALF_EXTENT, 0.1, GROUND_HALF_EXTENT),
        )]),
        Friction {
            coefficient: 1.0,
            combine_rule: CoefficientCombineRule::Average,
        },
    ));

    // Low warm sun.
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            color: Color::srgb(1.0, 0.93, 0.82),
            illuminance: 10_000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(-15.0, 10.0, 15.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}
