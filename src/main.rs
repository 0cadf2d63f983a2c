use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use meadow_walk::prelude::*;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb_u8(0xca, 0xd4, 0xdb)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::srgb(0.95, 0.88, 0.78),
            brightness: 400.0,
        })
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Meadow Walk".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins(EnvironmentPlugin)   // ground + lighting
        .add_plugins(PlayerPlugin)        // capsule character (physics driven)
        .add_plugins(FollowCameraPlugin)  // viewer position for the LOD scan
        .add_plugins(GrassShadingPlugin)  // uniform record: time + tuning sync
        .add_plugins(TuningPlugin)        // keyboard tweak surface
        .add_plugins(GrassLodPlugin)      // field config, tiers, per-frame classify
        .add_plugins(InstanceFieldPlugin) // one-time async placement build
        .add_plugins(GrassInstancingPlugin) // instance buffers + draw
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(LogDiagnosticsPlugin::default())
        .run();
}
