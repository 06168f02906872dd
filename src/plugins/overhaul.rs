use bevy::prelude::*;

use crate::plugins::bubble::BubblePlugin;
use crate::plugins::core_sim::CoreSimPlugin;
use crate::plugins::observer::ObserverPlugin;
use crate::plugins::presence::PresencePlugin;
use crate::plugins::render_sync::RenderSyncPlugin;
use crate::plugins::settings::{SettingsPlugin, DEFAULT_SETTINGS_PATH};
use crate::plugins::tunnel::TunnelPlugin;

/// Both lighting controllers plus the plumbing they share.
pub struct LightingOverhaulPlugin {
    /// RON settings file read at startup; `None` expects the host to insert `LightingSettings`.
    pub settings_path: Option<String>,
}

impl Default for LightingOverhaulPlugin {
    fn default() -> Self {
        Self { settings_path: Some(DEFAULT_SETTINGS_PATH.to_string()) }
    }
}

impl LightingOverhaulPlugin {
    pub fn headless() -> Self {
        Self { settings_path: None }
    }
}

impl Plugin for LightingOverhaulPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(CoreSimPlugin)           // clock + system sets
            .add_plugins(SettingsPlugin { path: self.settings_path.clone() })
            .add_plugins(ObserverPlugin)         // observer position
            .add_plugins(PresencePlugin)         // enclosure probes
            .add_plugins(TunnelPlugin)           // global darkness
            .add_plugins(BubblePlugin)           // local light tweaks
            .add_plugins(RenderSyncPlugin);      // host state -> bevy lights
    }
}
