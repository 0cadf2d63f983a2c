//! Library entry for integration tests & external tooling.
//! Exposes plugin modules and a prelude for common types.

pub mod plugins {
    pub mod blade_geometry;
    pub mod camera;
    pub mod environment;
    pub mod grass_instancing;
    pub mod grass_lod;
    pub mod grass_shading;
    pub mod instance_field;
    pub mod player;
    pub mod tuning;
}
pub mod prelude;
