// Tunnel darkness: presence -> smoothed presence -> Open/Enclosed (hysteresis + dwell) ->
// eased darkness -> scaled sun and ambient.
//
// Entering blends darkness in over the configured time. Leaving is instant: the captured
// baseline is written straight back. Nothing global is touched while Open.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::plugins::baseline::{color_diff_sq, scale_rgb, AmbientMode, GlobalLightBaseline, SceneAmbient, Sun};
use crate::plugins::core_sim::{LightingSet, SimClock};
use crate::plugins::observer::ObserverPosition;
use crate::plugins::presence::PresenceReading;
use crate::plugins::settings::{LightingSettings, TunnelTargets, TunnelTuning};

const SCALAR_EPSILON: f32 = 0.0005;
const COLOR_EPSILON_SQ: f32 = 0.000_001;
const MIN_BLEND_SECONDS: f32 = 0.0001;
const DEBUG_LOG_INTERVAL: f32 = 1.0;

pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Critically damped follower clamped to [0, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CriticalDamp {
    pub value: f32,
    pub velocity: f32,
}

impl CriticalDamp {
    pub fn step(&mut self, target: f32, smooth_time: f32, dt: f32) -> f32 {
        if smooth_time <= 0.0001 {
            self.value = target.clamp(0.0, 1.0);
            self.velocity = 0.0;
            return self.value;
        }
        if dt <= 0.0 {
            return self.value;
        }
        let omega = 2.0 / smooth_time;
        let x = omega * dt;
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
        let change = self.value - target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut out = target + (change + temp) * decay;
        // no overshoot
        if (target - self.value > 0.0) == (out > target) {
            out = target;
            self.velocity = 0.0;
        }
        self.value = out.clamp(0.0, 1.0);
        self.value
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Darkness to light multiplier. [0, 1] dims linearly to `1 - max_fraction`; (1, 2] continues
/// from there down to black.
pub fn darkness_factor(darkness: f32, max_fraction: f32) -> f32 {
    let core = darkness.clamp(0.0, 1.0);
    let extra = (darkness - 1.0).clamp(0.0, 1.0);
    let base = 1.0 - max_fraction * core;
    base + (0.0 - base) * extra
}

/// Darkness wanted for a given (slow) presence, capped near tunnel mouths where radial
/// coverage is still low.
pub fn target_darkness(dark_presence: f32, intensity: f32, radial: f32, tuning: &TunnelTuning) -> f32 {
    let wanted = (dark_presence * 2.0 * intensity.clamp(0.0, 1.0)).min(2.0);
    let cap = tuning.portal_cap_min + (tuning.portal_cap_max - tuning.portal_cap_min) * radial.clamp(0.0, 1.0);
    wanted.min(cap)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TunnelState {
    #[default]
    Open,
    Enclosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Blend {
    start: f32,
    duration: f32,
}

/// Everything the state machine consumes for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunnelInput {
    pub now: f32,
    pub dt: f32,
    pub raw_presence: f32,
    pub radial: f32,
    pub intensity: f32,
    pub blend_time: f32,
}

#[derive(Resource, Debug, Default, Clone)]
pub struct TunnelRuntime {
    state: TunnelState,
    presence: CriticalDamp,
    dark_presence: CriticalDamp,
    darkness: f32,
    blend: Option<Blend>,
    last_transition: Option<f32>,
    next_debug_log: f32,
}

impl TunnelRuntime {
    pub fn state(&self) -> TunnelState {
        self.state
    }

    pub fn is_enclosed(&self) -> bool {
        self.state == TunnelState::Enclosed
    }

    pub fn darkness(&self) -> f32 {
        self.darkness
    }

    pub fn smoothed_presence(&self) -> f32 {
        self.presence.value
    }

    pub fn dark_presence(&self) -> f32 {
        self.dark_presence.value
    }

    pub fn is_blending(&self) -> bool {
        self.blend.is_some()
    }

    pub fn last_transition(&self) -> Option<f32> {
        self.last_transition
    }

    fn dwell_elapsed(&self, now: f32, min_dwell: f32) -> bool {
        self.last_transition.map_or(true, |t| now - t >= min_dwell)
    }

    /// Drops to Open with no blend and zero darkness. Returns whether it was Enclosed.
    pub fn force_open(&mut self) -> bool {
        let was = self.is_enclosed();
        self.state = TunnelState::Open;
        self.blend = None;
        self.darkness = 0.0;
        self.presence.reset();
        self.dark_presence.reset();
        was
    }

    /// Advances one tick and reports a state change, if one was honored.
    pub fn step(&mut self, input: &TunnelInput, tuning: &TunnelTuning) -> Option<Transition> {
        let p = self.presence.step(input.raw_presence, tuning.presence_smooth_time, input.dt);
        let want_enclosed = match self.state {
            TunnelState::Open => p >= tuning.enter_threshold,
            TunnelState::Enclosed => p >= tuning.exit_threshold,
        };

        let mut transition = None;
        if want_enclosed != self.is_enclosed() && self.dwell_elapsed(input.now, tuning.min_dwell) {
            self.last_transition = Some(input.now);
            if want_enclosed {
                self.state = TunnelState::Enclosed;
                self.darkness = 0.0;
                let duration = input.blend_time.max(0.0);
                self.blend = (duration > MIN_BLEND_SECONDS).then_some(Blend { start: input.now, duration });
                transition = Some(Transition::Entered);
            } else {
                self.force_open();
                transition = Some(Transition::Exited);
            }
        }

        if self.is_enclosed() {
            let slow = self.dark_presence.step(input.raw_presence, tuning.dark_smooth_time, input.dt);
            let target = target_darkness(slow, input.intensity, input.radial, tuning);
            self.darkness = match self.blend {
                Some(b) => {
                    let t = ((input.now - b.start) / b.duration).clamp(0.0, 1.0);
                    if t >= 1.0 {
                        self.blend = None;
                    }
                    target * smoothstep(t)
                }
                None => target,
            };
        }
        transition
    }
}

/// Captured global light values plus the refresh bookkeeping.
#[derive(Resource, Debug, Default, Clone)]
pub struct TunnelBaseline {
    pub baseline: Option<GlobalLightBaseline>,
    pub last_refresh: Option<f32>,
}
impl TunnelBaseline {
    pub fn refresh_due(&self, now: f32, cooldown: f32) -> bool {
        self.last_refresh.map_or(true, |t| now - t >= cooldown)
    }
}

/// Writes the darkened values derived from `baseline`. Returns whether anything was written.
pub fn apply_darkness(
    baseline: &GlobalLightBaseline,
    darkness: f32,
    max_fraction: f32,
    gates: &TunnelTargets,
    force: bool,
    sun: Option<&mut DirectionalLight>,
    ambient: &mut SceneAmbient,
) -> bool {
    let factor = darkness_factor(darkness, max_fraction);
    let mut wrote = false;

    if let (true, Some(light), Some((_, base))) = (gates.sun, sun, baseline.sun) {
        let target = (base * factor).max(0.0);
        if force || (light.illuminance - target).abs() > SCALAR_EPSILON {
            light.illuminance = target;
            wrote = true;
        }
    }

    match baseline.mode {
        AmbientMode::Flat if gates.ambient_flat => {
            let target = scale_rgb(baseline.flat_color, factor);
            if force || color_diff_sq(ambient.flat_color, target) > COLOR_EPSILON_SQ {
                ambient.flat_color = target;
                wrote = true;
            }
        }
        AmbientMode::Skybox if gates.ambient_skybox => {
            let target = (baseline.skybox_intensity * factor).max(0.0);
            if force || (ambient.skybox_intensity - target).abs() > SCALAR_EPSILON {
                ambient.skybox_intensity = target;
                wrote = true;
            }
        }
        AmbientMode::Trilight if gates.ambient_trilight => {
            let sky = scale_rgb(baseline.sky_color, factor);
            let equator = scale_rgb(baseline.equator_color, factor);
            let ground = scale_rgb(baseline.ground_color, factor);
            let differs = color_diff_sq(ambient.sky_color, sky) > COLOR_EPSILON_SQ
                || color_diff_sq(ambient.equator_color, equator) > COLOR_EPSILON_SQ
                || color_diff_sq(ambient.ground_color, ground) > COLOR_EPSILON_SQ;
            if force || differs {
                ambient.sky_color = sky;
                ambient.equator_color = equator;
                ambient.ground_color = ground;
                wrote = true;
            }
        }
        _ => {}
    }
    wrote
}

/// The sun and ambient as one unit for capture / restore / apply.
#[derive(SystemParam)]
pub struct GlobalLights<'w, 's> {
    q_dir: Query<'w, 's, (Entity, &'static mut DirectionalLight, Has<Sun>)>,
    ambient: ResMut<'w, SceneAmbient>,
}

impl GlobalLights<'_, '_> {
    pub fn capture(&self) -> GlobalLightBaseline {
        let sun = self
            .q_dir
            .iter()
            .find(|(_, _, tagged)| *tagged)
            .or_else(|| self.q_dir.iter().next())
            .map(|(e, l, _)| (e, l));
        GlobalLightBaseline::capture(sun, &self.ambient)
    }

    pub fn restore(&mut self, baseline: &GlobalLightBaseline) {
        let sun = match baseline.sun {
            Some((e, _)) => self.q_dir.get_mut(e).ok().map(|(_, l, _)| l.into_inner()),
            None => None,
        };
        baseline.restore(sun, &mut self.ambient);
    }

    pub fn apply(&mut self, baseline: &GlobalLightBaseline, darkness: f32, settings: &LightingSettings, force: bool) -> bool {
        let max_fraction = settings.tunnel.max_darkness_fraction;
        let gates = settings.targets;
        let sun = match baseline.sun {
            Some((e, _)) => self.q_dir.get_mut(e).ok().map(|(_, l, _)| l.into_inner()),
            None => None,
        };
        apply_darkness(baseline, darkness, max_fraction, &gates, force, sun, &mut self.ambient)
    }
}

pub fn is_observer_enclosed(world: &World) -> bool {
    world.get_resource::<TunnelRuntime>().is_some_and(TunnelRuntime::is_enclosed)
}

pub struct TunnelPlugin;
impl Plugin for TunnelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TunnelRuntime>()
            .init_resource::<TunnelBaseline>()
            .init_resource::<SceneAmbient>()
            .add_systems(Update, update_tunnel.in_set(LightingSet::Decide))
            .add_systems(PostUpdate, reapply_tunnel_darkness)
            .add_systems(Last, reapply_tunnel_darkness.in_set(LightingSet::Apply));
    }
}

fn refresh_baseline_outside(runtime: &TunnelRuntime, store: &mut TunnelBaseline, lights: &GlobalLights, now: f32, cooldown: f32) {
    if runtime.is_enclosed() || !store.refresh_due(now, cooldown) {
        return;
    }
    store.baseline = Some(lights.capture());
    store.last_refresh = Some(now);
}

fn go_bright(runtime: &mut TunnelRuntime, store: &TunnelBaseline, lights: &mut GlobalLights, reason: &str) {
    if runtime.force_open() {
        if let Some(b) = store.baseline.as_ref() {
            lights.restore(b);
        }
        info!("TUNNEL state=open reason={reason}");
    }
}

fn update_tunnel(
    clock: Res<SimClock>,
    settings: Option<Res<LightingSettings>>,
    observer: Res<ObserverPosition>,
    reading: Res<PresenceReading>,
    mut runtime: ResMut<TunnelRuntime>,
    mut store: ResMut<TunnelBaseline>,
    mut lights: GlobalLights,
) {
    let now = clock.now;
    let cooldown = settings.as_ref().map_or(TunnelTuning::default().baseline_refresh_cooldown, |s| s.tunnel.baseline_refresh_cooldown);

    if observer.get().is_none() {
        go_bright(&mut runtime, &store, &mut lights, "observer_lost");
        return;
    }

    let settings = match settings {
        Some(s) if s.enable_tunnel_darkness => s,
        _ => {
            go_bright(&mut runtime, &store, &mut lights, "disabled");
            refresh_baseline_outside(&runtime, &mut store, &lights, now, cooldown);
            return;
        }
    };

    let input = TunnelInput {
        now,
        dt: clock.delta,
        raw_presence: reading.raw,
        radial: reading.radial,
        intensity: settings.tunnel_intensity(),
        blend_time: settings.blend_time(),
    };
    let transition = runtime.step(&input, &settings.tunnel);

    match transition {
        Some(Transition::Entered) => {
            if store.baseline.is_none() {
                store.baseline = Some(lights.capture());
                store.last_refresh = Some(now);
            }
            info!("TUNNEL state=enclosed t={now:.2} presence={:.2}", runtime.smoothed_presence());
        }
        Some(Transition::Exited) => {
            if let Some(b) = store.baseline.as_ref() {
                lights.restore(b);
            }
            info!("TUNNEL state=open t={now:.2} presence={:.2}", runtime.smoothed_presence());
        }
        None => {}
    }

    if settings.verbose_tunnel_logs && now >= runtime.next_debug_log {
        info!(
            "TUNNEL presence cone={:.2} radial={:.2} smoothed={:.2} state={:?} blend={} dark={:.2}",
            reading.cone,
            reading.radial,
            runtime.smoothed_presence(),
            runtime.state(),
            runtime.is_blending(),
            runtime.darkness()
        );
        runtime.next_debug_log = now + DEBUG_LOG_INTERVAL;
    }

    if !runtime.is_enclosed() {
        refresh_baseline_outside(&runtime, &mut store, &lights, now, cooldown);
        return;
    }

    if let Some(b) = store.baseline.as_ref() {
        lights.apply(b, runtime.darkness(), &settings, transition.is_some());
    }
}

// Post-update and pre-render: win against anything that rewrote the values mid-frame.
fn reapply_tunnel_darkness(
    settings: Option<Res<LightingSettings>>,
    runtime: Res<TunnelRuntime>,
    store: Res<TunnelBaseline>,
    mut lights: GlobalLights,
) {
    let Some(settings) = settings else { return; };
    if !settings.enable_tunnel_darkness || !runtime.is_enclosed() {
        return;
    }
    if let Some(b) = store.baseline.as_ref() {
        lights.apply(b, runtime.darkness(), &settings, false);
    }
}
