//! Convenience re-exports for frequently used types & plugins.
pub use crate::plugins::core_sim::{CoreSimPlugin, LightingSet, SimClock};
pub use crate::plugins::settings::{
    parse_settings, BubbleTuning, ColorPreset, LightingSettings, SamplerTuning, SettingsError, SettingsPlugin,
    TunnelTargets, TunnelTuning, DEFAULT_SETTINGS_PATH,
};
#[cfg(not(target_arch = "wasm32"))]
pub use crate::plugins::settings::load_settings_from_path;
pub use crate::plugins::baseline::{
    AmbientMode, GlobalLightBaseline, SceneAmbient, SceneLight, ShadowMode, Sun, TweakRecord, TweakStore,
};
pub use crate::plugins::observer::{ObserverCamera, ObserverPlugin, ObserverPosition, Player, Vehicle};
pub use crate::plugins::classify::{LightClass, LightClassifier, LightClassifierRes, LightInfo, NamePrefixClassifier, PortableLight};
pub use crate::plugins::bubble::{BubblePlugin, BubbleState, RefreshLighting, SceneReady};
pub use crate::plugins::presence::{PresencePlugin, PresenceReading, WorldCaster};
pub use crate::plugins::tunnel::{is_observer_enclosed, TunnelBaseline, TunnelPlugin, TunnelRuntime, TunnelState};
pub use crate::plugins::render_sync::RenderSyncPlugin;
pub use crate::plugins::overhaul::LightingOverhaulPlugin;
pub use crate::plugins::demo_scene::DemoScenePlugin;
