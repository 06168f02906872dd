// Mirrors host light state onto Bevy's renderable light types, after every lighting write of
// the frame. Bounce intensity, shadow strength and bias have no Bevy counterpart and stay on
// `SceneLight`.
use bevy::prelude::*;

use crate::plugins::baseline::{AmbientMode, SceneAmbient, SceneLight, ShadowMode};
use crate::plugins::core_sim::LightingSet;

pub struct RenderSyncPlugin;
impl Plugin for RenderSyncPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Last, (sync_scene_lights, sync_ambient).after(LightingSet::Apply));
    }
}

pub fn ambient_output(ambient: &SceneAmbient) -> (Color, f32) {
    match ambient.mode {
        AmbientMode::Flat => (ambient.flat_color, ambient.brightness),
        AmbientMode::Skybox => (Color::WHITE, ambient.brightness * ambient.skybox_intensity),
        AmbientMode::Trilight => {
            let [a, b, c] = [ambient.sky_color, ambient.equator_color, ambient.ground_color].map(|c| c.to_srgba());
            let mean = Color::srgb(
                (a.red + b.red + c.red) / 3.0,
                (a.green + b.green + c.green) / 3.0,
                (a.blue + b.blue + c.blue) / 3.0,
            );
            (mean, ambient.brightness)
        }
    }
}

fn sync_scene_lights(
    mut q: Query<
        (&SceneLight, Option<&mut PointLight>, Option<&mut SpotLight>, Option<&mut Visibility>),
        Changed<SceneLight>,
    >,
) {
    for (light, point, spot, vis) in &mut q {
        let shadows = light.enabled && light.shadows != ShadowMode::None;
        if let Some(mut p) = point {
            p.color = light.color;
            p.shadows_enabled = shadows;
        }
        if let Some(mut s) = spot {
            s.color = light.color;
            s.shadows_enabled = shadows;
        }
        if let Some(mut v) = vis {
            let want = if light.enabled { Visibility::Inherited } else { Visibility::Hidden };
            if *v != want {
                *v = want;
            }
        }
    }
}

fn sync_ambient(ambient: Res<SceneAmbient>, out: Option<ResMut<AmbientLight>>) {
    let Some(mut out) = out else { return; };
    if !ambient.is_changed() {
        return;
    }
    let (color, brightness) = ambient_output(&ambient);
    out.color = color;
    out.brightness = brightness;
}
