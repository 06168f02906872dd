use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};

use lighting_overhaul::plugins::demo_scene::DemoScenePlugin;
use lighting_overhaul::plugins::overhaul::LightingOverhaulPlugin;
#[cfg(not(target_arch = "wasm32"))]
use lighting_overhaul::plugins::settings::{load_settings_from_path, LightingSettings, DEFAULT_SETTINGS_PATH};

fn main() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let with_tunnel = !std::env::args().any(|a| a == "--no-tunnel");
    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb(0.52, 0.80, 0.92)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::srgb(0.55, 0.55, 0.60),
            brightness: 800.0,
        });

    // No tunnel geometry: still run the controller, just without anything to darken for.
    #[cfg(not(target_arch = "wasm32"))]
    if !with_tunnel {
        let mut settings = load_settings_from_path(DEFAULT_SETTINGS_PATH).unwrap_or_else(|e| {
            warn!("SETTINGS fallback to defaults error={e}");
            LightingSettings::default()
        });
        settings.enable_tunnel_darkness = false;
        app.insert_resource(settings);
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window { title: "Lighting Overhaul".into(), ..default() }),
        ..default()
    }))
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
    .add_plugins(LightingOverhaulPlugin::default()) // bubble + tunnel controllers
    .add_plugins(DemoScenePlugin { with_tunnel })   // road, tunnel, lamps, driving camera
    .add_plugins(FrameTimeDiagnosticsPlugin)
    .add_plugins(LogDiagnosticsPlugin::default())
    .run();
}
