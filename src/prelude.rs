//! Convenience re-exports for frequently used types & plugins.
pub use crate::plugins::blade_geometry::{
    blade_positions, blade_vertex_count, build_blade_mesh, BladeParams, HIGH_DETAIL, LOW_DETAIL,
};
pub use crate::plugins::camera::{FollowCamera, FollowCameraConfig, FollowCameraPlugin};
pub use crate::plugins::environment::EnvironmentPlugin;
pub use crate::plugins::grass_instancing::{
    GrassInstanceData, GrassInstancingPlugin, GrassTierInstances,
};
pub use crate::plugins::grass_lod::{
    classify_field, classify_instances, GrassConfig, GrassLodPlugin, GrassTier,
};
pub use crate::plugins::grass_shading::{
    apply_tuning, GrassShadingParams, GrassShadingPlugin, GrassTuning,
};
pub use crate::plugins::instance_field::{
    BladeInstance, InstanceField, InstanceFieldPlugin,
};
pub use crate::plugins::player::{Player, PlayerPlugin};
pub use crate::plugins::tuning::TuningPlugin;
