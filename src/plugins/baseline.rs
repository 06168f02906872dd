// Host-facing light state plus the snapshots taken before we touch it.
use bevy::prelude::*;
use bevy::utils::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowMode {
    #[default]
    None,
    Hard,
    Soft,
}

/// Mutable parameters of a local light source, owned by the host scene.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct SceneLight {
    pub enabled: bool,
    pub color: Color,
    pub bounce_intensity: f32,
    pub shadows: ShadowMode,
    pub shadow_strength: f32,
    pub shadow_bias: f32,
}
impl Default for SceneLight {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::WHITE,
            bounce_intensity: 1.0,
            shadows: ShadowMode::None,
            shadow_strength: 1.0,
            shadow_bias: 0.05,
        }
    }
}

/// Pre-tweak values of one light. `applied` is cleared on revert; the storage is reused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweakRecord {
    pub enabled: bool,
    pub color: Color,
    pub bounce_intensity: f32,
    pub shadows: ShadowMode,
    pub shadow_strength: f32,
    pub shadow_bias: f32,
    pub applied: bool,
}

impl TweakRecord {
    pub fn capture(light: &SceneLight) -> Self {
        Self {
            enabled: light.enabled,
            color: light.color,
            bounce_intensity: light.bounce_intensity,
            shadows: light.shadows,
            shadow_strength: light.shadow_strength,
            shadow_bias: light.shadow_bias,
            applied: false,
        }
    }

    /// Writes the captured values back. No-op when nothing is applied.
    pub fn restore(&mut self, light: &mut SceneLight) -> bool {
        if !self.applied {
            return false;
        }
        light.enabled = self.enabled;
        light.color = self.color;
        light.bounce_intensity = self.bounce_intensity;
        light.shadows = self.shadows;
        light.shadow_strength = self.shadow_strength;
        light.shadow_bias = self.shadow_bias;
        self.applied = false;
        true
    }
}

/// Per-light records keyed by entity.
#[derive(Resource, Default, Debug)]
pub struct TweakStore {
    records: HashMap<Entity, TweakRecord>,
}

impl TweakStore {
    /// Returns the record for an activation, capturing only if no tweak is live.
    pub fn begin(&mut self, id: Entity, light: &SceneLight) -> &mut TweakRecord {
        let fresh = TweakRecord::capture(light);
        let rec = self.records.entry(id).or_insert(fresh);
        if !rec.applied {
            *rec = fresh;
        }
        rec
    }

    pub fn revert(&mut self, id: Entity, light: &mut SceneLight) -> bool {
        match self.records.get_mut(&id) {
            Some(rec) => rec.restore(light),
            None => false,
        }
    }

    pub fn get(&self, id: Entity) -> Option<&TweakRecord> {
        self.records.get(&id)
    }

    pub fn is_applied(&self, id: Entity) -> bool {
        self.records.get(&id).is_some_and(|r| r.applied)
    }

    /// Drops the record of a light that no longer exists.
    pub fn forget(&mut self, id: Entity) {
        self.records.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbientMode {
    #[default]
    Flat,
    Skybox,
    Trilight,
}

/// Scene-wide ambient state. Only the fields of `mode` are meaningful.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SceneAmbient {
    pub mode: AmbientMode,
    pub flat_color: Color,
    pub skybox_intensity: f32,
    pub sky_color: Color,
    pub equator_color: Color,
    pub ground_color: Color,
    /// Bevy `AmbientLight::brightness` at intensity 1.
    pub brightness: f32,
}
impl Default for SceneAmbient {
    fn default() -> Self {
        Self {
            mode: AmbientMode::Flat,
            flat_color: Color::srgb(0.55, 0.55, 0.60),
            skybox_intensity: 1.0,
            sky_color: Color::srgb(0.60, 0.70, 0.85),
            equator_color: Color::srgb(0.50, 0.50, 0.50),
            ground_color: Color::srgb(0.30, 0.28, 0.25),
            brightness: 800.0,
        }
    }
}

/// Marks the directional light the tunnel dims. Without it the first directional light is used.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Sun;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalLightBaseline {
    pub sun: Option<(Entity, f32)>,
    pub mode: AmbientMode,
    pub flat_color: Color,
    pub skybox_intensity: f32,
    pub sky_color: Color,
    pub equator_color: Color,
    pub ground_color: Color,
}

impl GlobalLightBaseline {
    pub fn capture(sun: Option<(Entity, &DirectionalLight)>, ambient: &SceneAmbient) -> Self {
        Self {
            sun: sun.map(|(e, l)| (e, l.illuminance)),
            mode: ambient.mode,
            flat_color: ambient.flat_color,
            skybox_intensity: ambient.skybox_intensity,
            sky_color: ambient.sky_color,
            equator_color: ambient.equator_color,
            ground_color: ambient.ground_color,
        }
    }

    /// Writes back the sun and the captured mode's ambient fields only.
    pub fn restore(&self, sun: Option<&mut DirectionalLight>, ambient: &mut SceneAmbient) {
        if let (Some(light), Some((_, illuminance))) = (sun, self.sun) {
            light.illuminance = illuminance;
        }
        match self.mode {
            AmbientMode::Flat => ambient.flat_color = self.flat_color,
            AmbientMode::Skybox => ambient.skybox_intensity = self.skybox_intensity,
            AmbientMode::Trilight => {
                ambient.sky_color = self.sky_color;
                ambient.equator_color = self.equator_color;
                ambient.ground_color = self.ground_color;
            }
        }
    }
}

pub fn scale_rgb(c: Color, f: f32) -> Color {
    let s = c.to_srgba();
    Color::srgba(s.red * f, s.green * f, s.blue * f, s.alpha)
}

pub fn rgb(c: Color) -> Vec3 {
    let s = c.to_srgba();
    Vec3::new(s.red, s.green, s.blue)
}

pub fn color_diff_sq(a: Color, b: Color) -> f32 {
    let (a, b) = (a.to_srgba(), b.to_srgba());
    let d = Vec4::new(a.red - b.red, a.green - b.green, a.blue - b.blue, a.alpha - b.alpha);
    d.length_squared()
}
