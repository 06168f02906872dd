use bevy::prelude::*;
use lighting_overhaul::plugins::baseline::{AmbientMode, GlobalLightBaseline, SceneAmbient};
use lighting_overhaul::plugins::settings::{TunnelTargets, TunnelTuning};
use lighting_overhaul::plugins::tunnel::{
    apply_darkness, darkness_factor, smoothstep, target_darkness, CriticalDamp, Transition, TunnelInput, TunnelRuntime,
    TunnelState,
};

const DT: f32 = 1.0 / 60.0;

// Presence passes straight through so thresholds can be tested exactly.
fn instant() -> TunnelTuning {
    TunnelTuning { presence_smooth_time: 0.0, dark_smooth_time: 0.0, ..default() }
}

fn input(now: f32, raw: f32) -> TunnelInput {
    TunnelInput { now, dt: DT, raw_presence: raw, radial: 1.0, intensity: 0.5, blend_time: 5.0 }
}

#[test]
fn darkness_factor_curve() {
    assert!((darkness_factor(0.0, 0.9) - 1.0).abs() < 1e-6);
    assert!((darkness_factor(0.5, 0.9) - 0.55).abs() < 1e-6);
    assert!((darkness_factor(1.0, 0.9) - 0.1).abs() < 1e-6);
    assert!((darkness_factor(1.5, 0.9) - 0.05).abs() < 1e-6);
    assert!(darkness_factor(2.0, 0.9).abs() < 1e-6);
    assert!(darkness_factor(5.0, 0.9).abs() < 1e-6);
    assert!((darkness_factor(-1.0, 0.9) - 1.0).abs() < 1e-6);
}

#[test]
fn smoothstep_endpoints() {
    assert_eq!(smoothstep(0.0), 0.0);
    assert_eq!(smoothstep(1.0), 1.0);
    assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
    assert_eq!(smoothstep(2.0), 1.0);
}

#[test]
fn target_capped_near_portals() {
    let t = TunnelTuning::default();
    // Full presence, full intensity, no radial coverage: clamped to the portal floor.
    assert!((target_darkness(1.0, 1.0, 0.0, &t) - t.portal_cap_min).abs() < 1e-6);
    assert!((target_darkness(1.0, 1.0, 1.0, &t) - 2.0).abs() < 1e-6);
    assert!((target_darkness(0.5, 0.5, 1.0, &t) - 0.5).abs() < 1e-6);
}

#[test]
fn critical_damp_converges_without_overshoot() {
    let mut d = CriticalDamp::default();
    let mut prev = 0.0;
    for _ in 0..600 {
        let v = d.step(0.8, 0.45, DT);
        assert!(v >= prev - 1e-6 && v <= 0.8 + 1e-6);
        prev = v;
    }
    assert!((prev - 0.8).abs() < 1e-3);
}

#[test]
fn enters_once_smoothed_presence_crosses_threshold() {
    // Ramp 0 -> 0.5 over one second, then hold.
    let tuning = TunnelTuning::default();
    let mut rt = TunnelRuntime::default();
    let mut entered_at = None;
    let mut smoothed_at_entry = 0.0;
    let mut now = 0.0;
    for _ in 0..180 {
        now += DT;
        let raw = (now / 1.0).min(1.0) * 0.5;
        let before = rt.smoothed_presence();
        if rt.step(&input(now, raw), &tuning) == Some(Transition::Entered) {
            entered_at = Some(now);
            smoothed_at_entry = rt.smoothed_presence();
            assert!(before < tuning.enter_threshold);
            break;
        }
    }
    let entered_at = entered_at.expect("never entered");
    assert!(smoothed_at_entry >= tuning.enter_threshold);
    assert!(entered_at > 0.4 && entered_at < 3.0, "entered at {entered_at}");
    assert_eq!(rt.state(), TunnelState::Enclosed);
}

#[test]
fn hysteresis_and_dwell_limit_flapping() {
    let tuning = instant();
    let mut rt = TunnelRuntime::default();
    let mut changes = Vec::new();
    let mut now = 0.0;
    for i in 0..600 {
        now += DT;
        // Flips between 0.15 and 0.25 every frame.
        let raw = if i % 2 == 0 { 0.25 } else { 0.15 };
        if rt.step(&input(now, raw), &tuning).is_some() {
            changes.push(now);
        }
    }
    // 0.15 never drops below the exit threshold, so the first entry sticks.
    assert_eq!(changes.len(), 1);
    assert_eq!(rt.state(), TunnelState::Enclosed);
}

#[test]
fn dwell_spaces_transitions() {
    let tuning = instant();
    let mut rt = TunnelRuntime::default();
    let mut changes = Vec::new();
    let mut now = 0.0;
    for i in 0..600 {
        now += DT;
        let raw = if i % 2 == 0 { 1.0 } else { 0.0 };
        if rt.step(&input(now, raw), &tuning).is_some() {
            changes.push(now);
        }
    }
    assert!(changes.len() > 2);
    for w in changes.windows(2) {
        assert!(w[1] - w[0] >= tuning.min_dwell - 1e-4, "transitions {w:?} closer than dwell");
    }
}

#[test]
fn blend_is_monotonic_and_reaches_target() {
    let tuning = instant();
    let mut rt = TunnelRuntime::default();
    let mut now = 0.0;
    assert_eq!(rt.step(&input(now, 1.0), &tuning), Some(Transition::Entered));
    assert_eq!(rt.darkness(), target_darkness(1.0, 0.5, 1.0, &tuning) * smoothstep(0.0));
    let target = target_darkness(1.0, 0.5, 1.0, &tuning);

    let mut prev = rt.darkness();
    let mut halfway = None;
    while now < 6.0 {
        now += DT;
        rt.step(&input(now, 1.0), &tuning);
        assert!(rt.darkness() >= prev - 1e-6);
        if halfway.is_none() && now >= 2.5 {
            halfway = Some(rt.darkness());
        }
        prev = rt.darkness();
    }
    assert!((prev - target).abs() < 1e-4);
    assert!(!rt.is_blending());
    let halfway = halfway.unwrap_or_default();
    assert!((halfway - target * 0.5).abs() < 0.02, "halfway darkness {halfway}");
}

#[test]
fn zero_blend_time_applies_target_at_once() {
    let tuning = instant();
    let mut rt = TunnelRuntime::default();
    let i = TunnelInput { blend_time: 0.0, ..input(0.0, 1.0) };
    rt.step(&i, &tuning);
    assert!(!rt.is_blending());
    assert!((rt.darkness() - target_darkness(1.0, 0.5, 1.0, &tuning)).abs() < 1e-6);
}

#[test]
fn exit_resets_darkness_immediately() {
    let tuning = instant();
    let mut rt = TunnelRuntime::default();
    let mut now = 0.0;
    rt.step(&input(now, 1.0), &tuning);
    for _ in 0..120 {
        now += DT;
        rt.step(&input(now, 1.0), &tuning);
    }
    assert!(rt.darkness() > 0.0);
    now += DT;
    assert_eq!(rt.step(&input(now, 0.0), &tuning), Some(Transition::Exited));
    assert_eq!(rt.darkness(), 0.0);
    assert!(!rt.is_blending());
    assert_eq!(rt.last_transition(), Some(now));
}

#[test]
fn force_open_reports_previous_state() {
    let tuning = instant();
    let mut rt = TunnelRuntime::default();
    assert!(!rt.force_open());
    rt.step(&input(0.0, 1.0), &tuning);
    assert!(rt.force_open());
    assert_eq!(rt.state(), TunnelState::Open);
    assert_eq!(rt.darkness(), 0.0);
}

fn baseline(mode: AmbientMode) -> (GlobalLightBaseline, SceneAmbient, DirectionalLight) {
    let ambient = SceneAmbient { mode, ..default() };
    let sun = DirectionalLight { illuminance: 10_000.0, ..default() };
    (GlobalLightBaseline::capture(Some((Entity::from_raw(1), &sun)), &ambient), ambient, sun)
}

#[test]
fn darkness_scales_sun_and_active_ambient_only() {
    let (b, mut ambient, mut sun) = baseline(AmbientMode::Flat);
    let untouched_sky = ambient.sky_color;
    assert!(apply_darkness(&b, 1.0, 0.9, &TunnelTargets::default(), false, Some(&mut sun), &mut ambient));
    assert!((sun.illuminance - 1000.0).abs() < 1e-2);
    let flat = ambient.flat_color.to_srgba();
    let base = b.flat_color.to_srgba();
    assert!((flat.red - base.red * 0.1).abs() < 1e-5);
    assert_eq!(ambient.sky_color, untouched_sky);

    // Same values again: nothing to write.
    assert!(!apply_darkness(&b, 1.0, 0.9, &TunnelTargets::default(), false, Some(&mut sun), &mut ambient));
    // Forced: written regardless.
    assert!(apply_darkness(&b, 1.0, 0.9, &TunnelTargets::default(), true, Some(&mut sun), &mut ambient));
}

#[test]
fn disabled_targets_are_skipped() {
    let (b, mut ambient, mut sun) = baseline(AmbientMode::Skybox);
    let gates = TunnelTargets { sun: false, ambient_skybox: false, ..default() };
    assert!(!apply_darkness(&b, 1.0, 0.9, &gates, true, Some(&mut sun), &mut ambient));
    assert_eq!(sun.illuminance, 10_000.0);
    assert_eq!(ambient.skybox_intensity, b.skybox_intensity);
}

#[test]
fn trilight_scales_all_three_colors() {
    let (b, mut ambient, _) = baseline(AmbientMode::Trilight);
    apply_darkness(&b, 2.0, 0.9, &TunnelTargets::default(), false, None, &mut ambient);
    for c in [ambient.sky_color, ambient.equator_color, ambient.ground_color] {
        let s = c.to_srgba();
        assert!(s.red.abs() < 1e-6 && s.green.abs() < 1e-6 && s.blue.abs() < 1e-6);
    }
}

#[test]
fn restore_returns_captured_values() {
    let (b, mut ambient, mut sun) = baseline(AmbientMode::Flat);
    apply_darkness(&b, 1.5, 0.9, &TunnelTargets::default(), false, Some(&mut sun), &mut ambient);
    b.restore(Some(&mut sun), &mut ambient);
    assert_eq!(sun.illuminance, 10_000.0);
    assert_eq!(ambient.flat_color, b.flat_color);
}
