// Keyboard tuning surface for the grass shading values. Writes GrassTuning;
// the shading controller picks changes up by value comparison, so holding a
// key that lands on the same values costs nothing downstream.

use bevy::prelude::*;

use crate::plugins::grass_shading::GrassTuning;

/// Named color moods cycled with the digit keys.
struct GrassPreset {
    name: &'static str,
    tip: Color,
    base: Color,
    fog: Color,
}

fn presets() -> [GrassPreset; 3] {
    [
        GrassPreset {
            name: "meadow",
            tip: Color::srgb(0.84, 0.87, 0.39),
            base: Color::srgb(0.58, 0.62, 0.14),
            fog: Color::srgb(0.79, 0.83, 0.86),
        },
        GrassPreset {
            name: "lush",
            tip: Color::srgb(0.55, 0.85, 0.40),
            base: Color::srgb(0.12, 0.45, 0.18),
            fog: Color::srgb(0.72, 0.82, 0.88),
        },
        GrassPreset {
            name: "parched",
            tip: Color::srgb(0.89, 0.80, 0.45),
            base: Color::srgb(0.62, 0.50, 0.22),
            fog: Color::srgb(0.88, 0.85, 0.78),
        },
    ]
}

pub struct TuningPlugin;
impl Plugin for TuningPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, tuning_input);
    }
}

fn tuning_input(keys: Res<ButtonInput<KeyCode>>, mut tuning: ResMut<GrassTuning>) {
    let digits = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3];
    for (i, key) in digits.into_iter().enumerate() {
        if keys.just_pressed(key) {
            let preset = &presets()[i];
            tuning.tip_color = preset.tip;
            tuning.base_color = preset.base;
            tuning.fog_color = preset.fog;
            info!("GRASS preset={}", preset.name);
        }
    }

    if keys.just_pressed(KeyCode::BracketLeft) {
        tuning.wind_frequency = (tuning.wind_frequency - Vec2::splat(0.5)).max(Vec2::splat(0.5));
        info!("GRASS wind_frequency={:?}", tuning.wind_frequency);
    }
    if keys.just_pressed(KeyCode::BracketRight) {
        tuning.wind_frequency = (tuning.wind_frequency + Vec2::splat(0.5)).min(Vec2::splat(20.0));
        info!("GRASS wind_frequency={:?}", tuning.wind_frequency);
    }
    if keys.just_pressed(KeyCode::Minus) {
        tuning.wind_speed = (tuning.wind_speed - 0.5).max(0.0);
        info!("GRASS wind_speed={}", tuning.wind_speed);
    }
    if keys.just_pressed(KeyCode::Equal) {
        tuning.wind_speed = (tuning.wind_speed + 0.5).min(10.0);
        info!("GRASS wind_speed={}", tuning.wind_speed);
    }
}
