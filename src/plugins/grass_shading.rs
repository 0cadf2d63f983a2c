// Shading parameter controller: the single mutable uniform record consumed
// by the grass shader. Updated by a per-frame time advance and an
// edge-triggered sync from the live tuning surface. Both render tiers read
// this one record; it is never duplicated per tier.

use bevy::color::LinearRgba;
use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;

use crate::plugins::blade_geometry::HIGH_DETAIL;

/// Live-tunable shading inputs. The tuning plugin (or anything else) writes
/// these at will; the controller copies changed values into
/// [`GrassShadingParams`] by value comparison.
#[derive(Resource, Clone, PartialEq, Debug)]
pub struct GrassTuning {
    pub wind_frequency: Vec2,
    pub wind_speed: f32,
    pub tip_color: Color,
    pub base_color: Color,
    pub fog_color: Color,
}

impl Default for GrassTuning {
    fn default() -> Self {
        Self {
            wind_frequency: Vec2::splat(5.0),
            wind_speed: 3.0,
            tip_color: Color::srgb_u8(0xd5, 0xde, 0x63),
            base_color: Color::srgb_u8(0x94, 0x9f, 0x24),
            fog_color: Color::srgb_u8(0xca, 0xd4, 0xdb),
        }
    }
}

/// The uniform record itself. `time` is monotonic for the session; colors
/// are stored pre-converted to linear space so the sync comparison matches
/// what the GPU sees.
#[derive(Resource, ExtractResource, Clone, PartialEq, Debug)]
pub struct GrassShadingParams {
    pub wind_frequency: Vec2,
    pub time: f32,
    pub wind_speed: f32,
    pub tip_color: LinearRgba,
    pub base_color: LinearRgba,
    pub fog_color: LinearRgba,
    pub half_width: f32,
    pub blade_height: f32,
}

impl Default for GrassShadingParams {
    fn default() -> Self {
        let tuning = GrassTuning::default();
        Self {
            wind_frequency: tuning.wind_frequency,
            time: 0.0,
            wind_speed: tuning.wind_speed,
            tip_color: tuning.tip_color.to_linear(),
            base_color: tuning.base_color.to_linear(),
            fog_color: tuning.fog_color.to_linear(),
            half_width: HIGH_DETAIL.half_width,
            blade_height: HIGH_DETAIL.height,
        }
    }
}

/// Copies tuning values that differ into the uniform record. Returns whether
/// anything changed; applying identical values twice is a no-op the second
/// time.
pub fn apply_tuning(params: &mut GrassShadingParams, tuning: &GrassTuning) -> bool {
    let mut changed = false;

    if params.wind_frequency != tuning.wind_frequency {
        params.wind_frequency = tuning.wind_frequency;
        changed = true;
    }
    if params.wind_speed != tuning.wind_speed {
        params.wind_speed = tuning.wind_speed;
        changed = true;
    }

    let tip = tuning.tip_color.to_linear();
    if params.tip_color != tip {
        params.tip_color = tip;
        changed = true;
    }
    let base = tuning.base_color.to_linear();
    if params.base_color != base {
        params.base_color = base;
        changed = true;
    }
    let fog = tuning.fog_color.to_linear();
    if params.fog_color != fog {
        params.fog_color = fog;
        changed = true;
    }

    changed
}

pub struct GrassShadingPlugin;
impl Plugin for GrassShadingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GrassTuning>()
            .init_resource::<GrassShadingParams>()
            .add_systems(Update, (advance_wind_time, sync_tuning).chain());
    }
}

/// Per-frame tick: `time` accumulates the frame delta and never resets.
pub fn advance_wind_time(time: Res<Time>, mut params: ResMut<GrassShadingParams>) {
    params.time += time.delta_seconds();
}

/// Edge-triggered sync: applied immediately, no interpolation of the
/// transition. Comparison is by value, not by change ticks, so an external
/// writer that rewrites the same values costs nothing downstream.
pub fn sync_tuning(tuning: Res<GrassTuning>, mut params: ResMut<GrassShadingParams>) {
    apply_tuning(params.bypass_change_detection(), &tuning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_is_idempotent() {
        let mut params = GrassShadingParams::default();
        let tuning = GrassTuning {
            tip_color: Color::srgb(0.9, 0.9, 0.2),
            ..default()
        };

        assert!(apply_tuning(&mut params, &tuning));
        let snapshot = params.clone();
        assert!(!apply_tuning(&mut params, &tuning));
        assert_eq!(params, snapshot);
    }

    #[test]
    fn unchanged_tuning_leaves_record_untouched() {
        let mut params = GrassShadingParams::default();
        let snapshot = params.clone();
        assert!(!apply_tuning(&mut params, &GrassTuning::default()));
        assert_eq!(params, snapshot);
    }

    #[test]
    fn wind_values_follow_tuning() {
        let mut params = GrassShadingParams::default();
        let tuning = GrassTuning {
            wind_frequency: Vec2::new(2.0, 8.0),
            wind_speed: 1.5,
            ..default()
        };
        assert!(apply_tuning(&mut params, &tuning));
        assert_eq!(params.wind_frequency, Vec2::new(2.0, 8.0));
        assert_eq!(params.wind_speed, 1.5);
    }
}
