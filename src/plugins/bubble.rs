// Proximity bubble: the nearest default-colored local lights around the observer get the
// configured tint and soft shadows; lights leaving the bubble are restored.
//
// Pass structure:
//  - gather candidates (enabled, visible, not a gadget)
//  - select_bubble -> nearest N within the radius (or any N without an observer)
//  - reconcile -> revert lights that left, tweak lights that entered
//
// Passes run on a coarse timer and only after the observer moved far enough, except for the
// forced burst right after a scene load or refresh request.

use std::time::Duration;

use bevy::hierarchy::HierarchyQueryExt;
use bevy::prelude::*;
use bevy::utils::HashSet;

use crate::plugins::baseline::{rgb, SceneLight, ShadowMode, TweakStore};
use crate::plugins::classify::{
    default_gadget_prefixes, LightClass, LightClassifierRes, LightInfo, NamePrefixClassifier, PortableLight,
};
use crate::plugins::core_sim::{LightingSet, SimClock};
use crate::plugins::observer::ObserverPosition;
use crate::plugins::settings::LightingSettings;

/// Colors lights ship with before anything customizes them.
pub const DEFAULT_LIGHT_COLORS: [Vec3; 3] = [
    Vec3::new(0.910, 0.930, 0.880),
    Vec3::new(1.000, 0.900, 0.750),
    Vec3::new(1.000, 1.000, 1.000),
];

pub const TWEAK_SHADOW_STRENGTH: f32 = 1.0;
pub const TWEAK_SHADOW_BIAS: f32 = 0.001;
pub const TWEAK_BOUNCE_INTENSITY: f32 = 1.0;

/// Scene finished loading; resets the bubble and starts a forced burst.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct SceneReady;

/// Revert everything and reselect immediately (e.g. after a settings edit).
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RefreshLighting;

#[derive(Resource, Debug)]
pub struct BubbleState {
    pub active: HashSet<Entity>,
    pub last_observer: Option<Vec3>,
    last_logged: Option<usize>,
    burst_remaining: u32,
    timer: Timer,
}
impl Default for BubbleState {
    fn default() -> Self {
        Self {
            active: HashSet::default(),
            last_observer: None,
            last_logged: None,
            burst_remaining: 0,
            timer: Timer::from_seconds(0.75, TimerMode::Repeating),
        }
    }
}

impl BubbleState {
    /// Forgets everything and schedules `burst` forced passes.
    pub fn reset(&mut self, burst: u32) {
        self.active.clear();
        self.last_observer = None;
        self.last_logged = None;
        self.burst_remaining = burst;
        self.timer.reset();
    }

    pub fn burst_remaining(&self) -> u32 {
        self.burst_remaining
    }

    /// True on the first evaluation and whenever the observer travelled `min_move` since the
    /// last one. An unknown observer never counts as movement.
    pub fn moved_enough(&mut self, observer: Option<Vec3>, min_move: f32) -> bool {
        let Some(pos) = observer else { return false; };
        match self.last_observer {
            None => {
                self.last_observer = Some(pos);
                true
            }
            Some(last) if (pos - last).length_squared() >= min_move * min_move => {
                self.last_observer = Some(pos);
                true
            }
            Some(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: Entity,
    pub position: Vec3,
}

/// Nearest `max_count` candidates within `max_distance`, closest first. Without an observer
/// the first `max_count` candidates are taken as they come.
pub fn select_bubble(candidates: &[Candidate], observer: Option<Vec3>, max_distance: f32, max_count: usize) -> Vec<Entity> {
    let max_count = max_count.max(1);
    let Some(origin) = observer else {
        return candidates.iter().take(max_count).map(|c| c.id).collect();
    };
    let max_d2 = max_distance * max_distance;
    let mut in_range: Vec<(Entity, f32)> = candidates
        .iter()
        .map(|c| (c.id, (c.position - origin).length_squared()))
        .filter(|(_, d2)| *d2 <= max_d2)
        .collect();
    in_range.sort_by(|a, b| a.1.total_cmp(&b.1));
    in_range.into_iter().take(max_count).map(|(id, _)| id).collect()
}

pub fn matches_default_color(color: Color, tolerance: f32) -> bool {
    let v = rgb(color);
    DEFAULT_LIGHT_COLORS.iter().any(|d| v.distance(*d) < tolerance)
}

/// What a tweak does to a light, resolved from settings once per pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweakParams {
    pub shadows: bool,
    pub tint: Option<Color>,
    pub tolerance: f32,
}
impl TweakParams {
    pub fn from_settings(s: &LightingSettings) -> Self {
        Self {
            shadows: s.enable_dynamic_shadows,
            tint: s.enable_tint.then(|| s.color_preset.color()),
            tolerance: s.bubble.color_tolerance,
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.shadows && self.tint.is_none()
    }
}

/// Tweaks one light if it still wears a default color. Captures the record first.
pub fn apply_aesthetic(id: Entity, light: &mut SceneLight, store: &mut TweakStore, p: &TweakParams) -> bool {
    if p.is_noop() || !matches_default_color(light.color, p.tolerance) {
        return false;
    }
    let record = store.begin(id, light);
    if p.shadows {
        light.shadows = ShadowMode::Soft;
        light.shadow_strength = TWEAK_SHADOW_STRENGTH;
        light.shadow_bias = TWEAK_SHADOW_BIAS;
    }
    if let Some(tint) = p.tint {
        light.color = tint;
        light.bounce_intensity = TWEAK_BOUNCE_INTENSITY;
    }
    record.applied = true;
    true
}

/// Access to the host's lights by handle.
pub trait LightLookup {
    fn light(&self, id: Entity) -> Option<&SceneLight>;
    fn light_mut(&mut self, id: Entity) -> Option<&mut SceneLight>;
}

impl LightLookup for bevy::utils::HashMap<Entity, SceneLight> {
    fn light(&self, id: Entity) -> Option<&SceneLight> {
        self.get(&id)
    }
    fn light_mut(&mut self, id: Entity) -> Option<&mut SceneLight> {
        self.get_mut(&id)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassOutcome {
    pub reverted: Vec<Entity>,
    pub tweaked: Vec<Entity>,
    pub dropped: Vec<Entity>,
}

/// Brings `active` to exactly the tweaked subset of `selected`.
pub fn reconcile(
    active: &mut HashSet<Entity>,
    selected: &[Entity],
    lights: &mut impl LightLookup,
    store: &mut TweakStore,
    params: &TweakParams,
) -> PassOutcome {
    let mut out = PassOutcome::default();

    // Destroyed lights: nothing left to restore into.
    active.retain(|id| {
        let alive = lights.light(*id).is_some();
        if !alive {
            store.forget(*id);
            out.dropped.push(*id);
        }
        alive
    });

    let target: HashSet<Entity> = selected.iter().copied().collect();
    let leaving: Vec<Entity> = active.iter().copied().filter(|id| !target.contains(id)).collect();
    for id in leaving {
        if let Some(light) = lights.light_mut(id) {
            store.revert(id, light);
        }
        active.remove(&id);
        out.reverted.push(id);
    }

    for &id in selected {
        if active.contains(&id) {
            continue;
        }
        let eligible = lights
            .light(id)
            .is_some_and(|l| !params.is_noop() && matches_default_color(l.color, params.tolerance));
        if !eligible {
            continue;
        }
        let Some(light) = lights.light_mut(id) else { continue; };
        if apply_aesthetic(id, light, store, params) {
            active.insert(id);
            out.tweaked.push(id);
        }
    }
    out
}

/// Restores every active light and empties the set. Returns how many were restored.
pub fn revert_all(active: &mut HashSet<Entity>, lights: &mut impl LightLookup, store: &mut TweakStore) -> usize {
    let mut restored = 0;
    for id in active.drain() {
        match lights.light_mut(id) {
            Some(light) => {
                if store.revert(id, light) {
                    restored += 1;
                }
            }
            None => store.forget(id),
        }
    }
    restored
}

type LightItem = (
    Entity,
    &'static mut SceneLight,
    &'static GlobalTransform,
    Option<&'static InheritedVisibility>,
    Has<PortableLight>,
);

struct QueryLights<'a, 'w, 's>(&'a mut Query<'w, 's, LightItem>);

impl LightLookup for QueryLights<'_, '_, '_> {
    fn light(&self, id: Entity) -> Option<&SceneLight> {
        self.0.get(id).ok().map(|(_, l, ..)| l)
    }
    fn light_mut(&mut self, id: Entity) -> Option<&mut SceneLight> {
        self.0.get_mut(id).ok().map(|(_, l, ..)| l.into_inner())
    }
}

pub struct BubblePlugin;
impl Plugin for BubblePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SceneReady>()
            .add_event::<RefreshLighting>()
            .init_resource::<BubbleState>()
            .init_resource::<TweakStore>()
            .add_systems(Update, (handle_bubble_requests, bubble_pass, forget_despawned_lights).chain().in_set(LightingSet::Decide));
        if !app.world().contains_resource::<LightClassifierRes>() {
            app.insert_resource(LightClassifierRes::new(NamePrefixClassifier::new(default_gadget_prefixes())));
        }
    }
}

fn handle_bubble_requests(
    mut ev_ready: EventReader<SceneReady>,
    mut ev_refresh: EventReader<RefreshLighting>,
    settings: Option<Res<LightingSettings>>,
    mut state: ResMut<BubbleState>,
    mut store: ResMut<TweakStore>,
    mut q_lights: Query<LightItem>,
) {
    let scene_ready = ev_ready.read().count() > 0;
    let settings_edited = settings.as_ref().is_some_and(|s| s.is_changed() && !s.is_added());
    let refresh = ev_refresh.read().count() > 0 || settings_edited;
    if !scene_ready && !refresh {
        return;
    }

    let mut lights = QueryLights(&mut q_lights);
    let restored = revert_all(&mut state.active, &mut lights, &mut store);
    // At least one pass right away, whatever the configured burst.
    let burst = settings.as_ref().map_or(0, |s| s.bubble.burst_frames).max(1);
    state.reset(burst);
    if let Some(s) = settings.as_ref() {
        let interval = s.bubble.update_interval.max(0.01);
        state.timer.set_duration(Duration::from_secs_f32(interval));
    }
    if refresh {
        info!("BUBBLE refresh restored={restored}");
    } else {
        debug!("BUBBLE scene_ready restored={restored}");
    }
}

fn bubble_pass(
    clock: Res<SimClock>,
    settings: Option<Res<LightingSettings>>,
    observer: Res<ObserverPosition>,
    classifier: Res<LightClassifierRes>,
    mut state: ResMut<BubbleState>,
    mut store: ResMut<TweakStore>,
    mut q_lights: Query<LightItem>,
    q_names: Query<&Name>,
    q_parents: Query<&Parent>,
) {
    let Some(settings) = settings else {
        // No configuration: nothing may stay tweaked.
        if !state.active.is_empty() {
            let restored = revert_all(&mut state.active, &mut QueryLights(&mut q_lights), &mut store);
            info!("BUBBLE disabled restored={restored}");
        }
        return;
    };

    let observer = observer.get();
    // Burst passes leave the movement gate untouched.
    if state.burst_remaining > 0 {
        state.burst_remaining -= 1;
    } else {
        if !state.timer.tick(Duration::from_secs_f32(clock.delta)).just_finished() {
            return;
        }
        if !state.moved_enough(observer, settings.bubble.min_move_meters) {
            return;
        }
    }

    let candidates: Vec<Candidate> = q_lights
        .iter()
        .filter(|(_, light, _, vis, _)| light.enabled && vis.map_or(true, |v| v.get()))
        .filter(|(id, _, _, _, portable)| {
            let names: Vec<&str> = std::iter::once(*id)
                .chain(q_parents.iter_ancestors(*id))
                .filter_map(|e| q_names.get(e).ok().map(|n| n.as_str()))
                .collect();
            classifier.classify(&LightInfo { names, portable: *portable }) == LightClass::Ordinary
        })
        .map(|(id, _, t, _, _)| Candidate { id, position: t.translation() })
        .collect();

    let selected = select_bubble(&candidates, observer, settings.max_distance(), settings.max_lights());
    let params = TweakParams::from_settings(&settings);
    let state = &mut *state;
    let outcome = reconcile(&mut state.active, &selected, &mut QueryLights(&mut q_lights), &mut store, &params);

    let count = state.active.len();
    if state.last_logged != Some(count) {
        info!(
            "BUBBLE active={count} tweaked={} reverted={} dropped={}",
            outcome.tweaked.len(),
            outcome.reverted.len(),
            outcome.dropped.len()
        );
        state.last_logged = Some(count);
    }
}

fn forget_despawned_lights(mut removed: RemovedComponents<SceneLight>, mut store: ResMut<TweakStore>, mut state: ResMut<BubbleState>) {
    for id in removed.read() {
        store.forget(id);
        state.active.remove(&id);
    }
}
