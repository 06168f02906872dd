use bevy::prelude::*;
use bevy::utils::{HashMap, HashSet};
use lighting_overhaul::plugins::baseline::{SceneLight, ShadowMode, TweakStore};
use lighting_overhaul::plugins::bubble::{
    apply_aesthetic, matches_default_color, reconcile, revert_all, select_bubble, BubbleState, Candidate, TweakParams,
    TWEAK_SHADOW_BIAS,
};
use lighting_overhaul::plugins::settings::{ColorPreset, LightingSettings};

fn id(i: u32) -> Entity {
    Entity::from_raw(i)
}

fn warm() -> Color {
    Color::srgb(1.0, 0.9, 0.75)
}

fn params() -> TweakParams {
    TweakParams::from_settings(&LightingSettings::default())
}

#[test]
fn only_near_source_selected() {
    let c = [
        Candidate { id: id(1), position: Vec3::new(5.0, 0.0, 0.0) },
        Candidate { id: id(2), position: Vec3::new(400.0, 0.0, 0.0) },
    ];
    assert_eq!(select_bubble(&c, Some(Vec3::ZERO), 150.0, 50), vec![id(1)]);
}

#[test]
fn selection_is_bounded_and_nearest_first() {
    let c: Vec<Candidate> = (0..40)
        .map(|i| Candidate { id: id(i), position: Vec3::new(100.0 - i as f32 * 2.0, 0.0, 0.0) })
        .collect();
    let picked = select_bubble(&c, Some(Vec3::ZERO), 150.0, 5);
    assert_eq!(picked, vec![id(39), id(38), id(37), id(36), id(35)]);
}

#[test]
fn without_observer_any_n_are_taken() {
    let c: Vec<Candidate> = (0..10).map(|i| Candidate { id: id(i), position: Vec3::splat(1e6) }).collect();
    assert_eq!(select_bubble(&c, None, 150.0, 3).len(), 3);
}

#[test]
fn default_color_matching_uses_tolerance() {
    assert!(matches_default_color(warm(), 0.02));
    assert!(matches_default_color(Color::WHITE, 0.02));
    assert!(matches_default_color(Color::srgb(0.91, 0.93, 0.88), 0.02));
    assert!(!matches_default_color(Color::srgb(1.0, 0.9, 0.70), 0.02));
    assert!(!matches_default_color(Color::srgb(0.9, 0.2, 0.2), 0.02));
}

#[test]
fn aesthetic_applies_tint_and_shadows() {
    let mut store = TweakStore::default();
    let mut light = SceneLight { color: warm(), ..default() };
    assert!(apply_aesthetic(id(1), &mut light, &mut store, &params()));
    assert_eq!(light.color, ColorPreset::WarmWhite.color());
    assert_eq!(light.shadows, ShadowMode::Soft);
    assert_eq!(light.shadow_bias, TWEAK_SHADOW_BIAS);
    assert!(store.is_applied(id(1)));
    assert_eq!(store.get(id(1)).map(|r| r.color), Some(warm()));
}

#[test]
fn customized_light_is_left_alone() {
    let mut store = TweakStore::default();
    let red = Color::srgb(0.9, 0.2, 0.2);
    let mut light = SceneLight { color: red, ..default() };
    assert!(!apply_aesthetic(id(1), &mut light, &mut store, &params()));
    assert_eq!(light.color, red);
    assert!(store.is_empty());
}

#[test]
fn noop_params_touch_nothing() {
    let p = TweakParams { shadows: false, tint: None, tolerance: 0.02 };
    let mut store = TweakStore::default();
    let mut light = SceneLight::default();
    assert!(!apply_aesthetic(id(1), &mut light, &mut store, &p));
    assert!(store.is_empty());
}

#[test]
fn shadows_only_keeps_color() {
    let s = LightingSettings { enable_tint: false, ..default() };
    let mut store = TweakStore::default();
    let mut light = SceneLight { color: warm(), ..default() };
    assert!(apply_aesthetic(id(1), &mut light, &mut store, &TweakParams::from_settings(&s)));
    assert_eq!(light.color, warm());
    assert_eq!(light.shadows, ShadowMode::Soft);
}

#[test]
fn reconcile_tweaks_and_reverts_exactly_once() {
    let mut lights: HashMap<Entity, SceneLight> = HashMap::default();
    for i in 0..4 {
        lights.insert(id(i), SceneLight { color: warm(), ..default() });
    }
    let mut store = TweakStore::default();
    let mut active = HashSet::default();

    let out = reconcile(&mut active, &[id(0), id(1)], &mut lights, &mut store, &params());
    assert_eq!(out.tweaked.len(), 2);
    assert_eq!(active.len(), 2);

    // Same selection again: idempotent.
    let out = reconcile(&mut active, &[id(0), id(1)], &mut lights, &mut store, &params());
    assert!(out.tweaked.is_empty() && out.reverted.is_empty());

    // 0 leaves, 2 enters.
    let out = reconcile(&mut active, &[id(1), id(2)], &mut lights, &mut store, &params());
    assert_eq!(out.reverted, vec![id(0)]);
    assert_eq!(out.tweaked, vec![id(2)]);
    assert_eq!(lights[&id(0)].color, warm());
    assert_eq!(lights[&id(0)].shadows, ShadowMode::None);
    assert!(!store.is_applied(id(0)));
    assert_eq!(lights[&id(2)].color, ColorPreset::WarmWhite.color());
    assert!(active.contains(&id(1)) && active.contains(&id(2)));
}

#[test]
fn reentering_light_recaptures_current_values() {
    let mut lights: HashMap<Entity, SceneLight> = HashMap::default();
    lights.insert(id(0), SceneLight { color: warm(), ..default() });
    let mut store = TweakStore::default();
    let mut active = HashSet::default();

    reconcile(&mut active, &[id(0)], &mut lights, &mut store, &params());
    reconcile(&mut active, &[], &mut lights, &mut store, &params());
    // Host edits the light while it sits outside the bubble.
    if let Some(l) = lights.get_mut(&id(0)) {
        l.bounce_intensity = 3.0;
    }
    reconcile(&mut active, &[id(0)], &mut lights, &mut store, &params());
    reconcile(&mut active, &[], &mut lights, &mut store, &params());
    assert_eq!(lights[&id(0)].bounce_intensity, 3.0);
}

#[test]
fn destroyed_lights_are_dropped_silently() {
    let mut lights: HashMap<Entity, SceneLight> = HashMap::default();
    lights.insert(id(0), SceneLight { color: warm(), ..default() });
    lights.insert(id(1), SceneLight { color: warm(), ..default() });
    let mut store = TweakStore::default();
    let mut active = HashSet::default();
    reconcile(&mut active, &[id(0), id(1)], &mut lights, &mut store, &params());

    lights.remove(&id(1));
    let out = reconcile(&mut active, &[id(0)], &mut lights, &mut store, &params());
    assert_eq!(out.dropped, vec![id(1)]);
    assert!(store.get(id(1)).is_none());
    assert_eq!(active.len(), 1);
}

#[test]
fn revert_all_restores_everything() {
    let mut lights: HashMap<Entity, SceneLight> = HashMap::default();
    for i in 0..3 {
        lights.insert(id(i), SceneLight { color: Color::WHITE, ..default() });
    }
    let mut store = TweakStore::default();
    let mut active = HashSet::default();
    reconcile(&mut active, &[id(0), id(1), id(2)], &mut lights, &mut store, &params());
    lights.remove(&id(2));

    assert_eq!(revert_all(&mut active, &mut lights, &mut store), 2);
    assert!(active.is_empty());
    assert!(lights.values().all(|l| l.color == Color::WHITE && l.shadows == ShadowMode::None));
    assert_eq!(revert_all(&mut active, &mut lights, &mut store), 0);
}

#[test]
fn movement_gate() {
    let mut state = BubbleState::default();
    assert!(!state.moved_enough(None, 8.0));
    assert!(state.moved_enough(Some(Vec3::ZERO), 8.0));
    assert!(!state.moved_enough(Some(Vec3::new(5.0, 0.0, 0.0)), 8.0));
    assert!(state.moved_enough(Some(Vec3::new(8.0, 0.0, 0.0)), 8.0));
    assert_eq!(state.last_observer, Some(Vec3::new(8.0, 0.0, 0.0)));
}
