// Lighting configuration (RON) and its loader.
use bevy::prelude::*;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
use thiserror::Error;

pub const DEFAULT_SETTINGS_PATH: &str = "assets/lighting.ron";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lighting settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Tint applied to local lights inside the bubble.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPreset {
    ColdWhite,
    #[default]
    WarmWhite,
    Yellow,
}
impl ColorPreset {
    pub fn color(self) -> Color {
        match self {
            ColorPreset::ColdWhite => Color::srgb(0.85, 0.92, 1.0),
            ColorPreset::WarmWhite => Color::srgb(1.0, 0.85, 0.65),
            ColorPreset::Yellow => Color::srgb(1.0, 0.85, 0.2),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BubbleTuning {
    pub update_interval: f32,  // seconds between periodic passes
    pub min_move_meters: f32,  // observer travel needed before a periodic pass runs
    pub burst_frames: u32,     // forced passes right after scene load / refresh
    pub color_tolerance: f32,  // RGB distance to a default color
}
impl Default for BubbleTuning {
    fn default() -> Self {
        Self { update_interval: 0.75, min_move_meters: 8.0, burst_frames: 3, color_tolerance: 0.02 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TunnelTuning {
    pub enter_threshold: f32,
    pub exit_threshold: f32,
    pub min_dwell: f32,
    pub presence_smooth_time: f32,
    pub dark_smooth_time: f32,
    pub max_darkness_fraction: f32,
    pub portal_cap_min: f32,
    pub portal_cap_max: f32,
    pub baseline_refresh_cooldown: f32,
    pub sampler_offset_y: f32,
}
impl Default for TunnelTuning {
    fn default() -> Self {
        Self {
            enter_threshold: 0.20,
            exit_threshold: 0.08,
            min_dwell: 0.5,
            presence_smooth_time: 0.45,
            dark_smooth_time: 0.90,
            max_darkness_fraction: 0.90,
            portal_cap_min: 0.65,
            portal_cap_max: 2.0,
            baseline_refresh_cooldown: 0.75,
            sampler_offset_y: 0.4,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SamplerTuning {
    pub cone_angle_deg: f32,
    pub cone_max_distance: f32,
    pub frames_per_sample: u32,
    pub buffer_size: usize,
    pub radial_count: u32,
    pub radial_length: f32,
    pub radial_spread: f32,
    pub radial_start_offset: f32,
    pub cast_radius: f32, // 0 => plain rays
}
impl Default for SamplerTuning {
    fn default() -> Self {
        Self {
            cone_angle_deg: 85.0,
            cone_max_distance: 12.0,
            frames_per_sample: 3,
            buffer_size: 30,
            radial_count: 8,
            radial_length: 20.0,
            radial_spread: 0.35,
            radial_start_offset: 0.2,
            cast_radius: 0.10,
        }
    }
}

/// Which global values the tunnel darkness is allowed to scale.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TunnelTargets {
    pub sun: bool,
    pub ambient_flat: bool,
    pub ambient_skybox: bool,
    pub ambient_trilight: bool,
}
impl Default for TunnelTargets {
    fn default() -> Self {
        Self { sun: true, ambient_flat: true, ambient_skybox: true, ambient_trilight: true }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Resource)]
#[serde(default)]
pub struct LightingSettings {
    pub enable_dynamic_shadows: bool,
    pub enable_tint: bool,
    pub color_preset: ColorPreset,
    pub max_distance_meters: f32,
    pub max_lights_count: u32,
    pub enable_tunnel_darkness: bool,
    pub tunnel_lighting_intensity: f32, // 0 = no change, 1 = max darkness
    pub tunnel_blend_time: f32,
    pub verbose_tunnel_logs: bool,
    pub bubble: BubbleTuning,
    pub tunnel: TunnelTuning,
    pub sampler: SamplerTuning,
    pub targets: TunnelTargets,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            enable_dynamic_shadows: true,
            enable_tint: true,
            color_preset: ColorPreset::WarmWhite,
            max_distance_meters: 150.0,
            max_lights_count: 50,
            enable_tunnel_darkness: true,
            tunnel_lighting_intensity: 0.75,
            tunnel_blend_time: 5.0,
            verbose_tunnel_logs: false,
            bubble: BubbleTuning::default(),
            tunnel: TunnelTuning::default(),
            sampler: SamplerTuning::default(),
            targets: TunnelTargets::default(),
        }
    }
}

impl LightingSettings {
    pub fn max_distance(&self) -> f32 {
        self.max_distance_meters.max(0.01)
    }
    pub fn max_lights(&self) -> usize {
        self.max_lights_count.max(1) as usize
    }
    pub fn tunnel_intensity(&self) -> f32 {
        self.tunnel_lighting_intensity.clamp(0.0, 1.0)
    }
    pub fn blend_time(&self) -> f32 {
        self.tunnel_blend_time.max(0.0)
    }
}

pub fn parse_settings(data: &str) -> Result<LightingSettings, SettingsError> {
    Ok(ron::from_str::<LightingSettings>(data)?)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_settings_from_path(path: &str) -> Result<LightingSettings, SettingsError> {
    let data = fs::read_to_string(path).map_err(|source| SettingsError::Io { path: path.to_string(), source })?;
    parse_settings(&data)
}

/// Where the plugin takes its configuration from.
#[derive(Resource, Clone, Debug)]
pub struct SettingsSource {
    pub path: Option<String>,
}

pub struct SettingsPlugin {
    pub path: Option<String>,
}
impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SettingsSource { path: self.path.clone() })
            .add_systems(Startup, load_settings);
    }
}

// Leaves `LightingSettings` absent on failure; downstream systems treat that as "disabled".
fn load_settings(mut commands: Commands, source: Res<SettingsSource>, existing: Option<Res<LightingSettings>>) {
    if existing.is_some() {
        return; // pre-inserted by the host
    }
    let Some(path) = source.path.as_deref() else { return; };

    #[cfg(target_arch = "wasm32")]
    {
        let _ = path;
        match parse_settings(include_str!("../../assets/lighting.ron")) {
            Ok(s) => commands.insert_resource(s),
            Err(e) => error!("SETTINGS embedded parse failed error={e}"),
        }
        return;
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        match load_settings_from_path(path) {
            Ok(s) => {
                info!("SETTINGS loaded path={path}");
                commands.insert_resource(s);
            }
            Err(e) => error!("SETTINGS load failed error={e}"),
        }
    }
}
