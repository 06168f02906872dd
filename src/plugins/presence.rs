// Enclosure presence: two cheap probes for "is there tunnel ceiling right above the observer".
//
//  - cone sampler: one ray every few frames inside an upward cone, nearest hit weighted 1 when it
//    is a tunnel surface; the running average over a short ring buffer is the signal
//  - radial fan: a fixed ring of short upward casts, each counting as a hit if anything along it
//    is a tunnel surface; hits / casts is the signal
//
// Raw presence is the larger of the two.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::plugins::core_sim::LightingSet;
use crate::plugins::observer::ObserverPosition;
use crate::plugins::settings::{LightingSettings, SamplerTuning};

pub const TUNNEL_NAME_SUFFIX: &str = "tunnel";
const MAX_SHAPE_HITS: usize = 8;
const GOLDEN_ANGLE: f32 = 2.399_963;
const GOLDEN_FRACTION: f32 = 0.618_034;

#[derive(Debug, Clone, PartialEq)]
pub struct CastHit {
    pub distance: f32,
    pub name: String,
}

/// World geometry queries. Hits come back sorted by distance.
pub trait WorldCaster {
    /// `radius == 0` is a plain ray; anything larger sweeps a sphere.
    fn cast_all(&self, origin: Vec3, dir: Vec3, radius: f32, max_distance: f32) -> Vec<CastHit>;
}

pub fn is_tunnel_surface(name: &str) -> bool {
    let n = TUNNEL_NAME_SUFFIX.len();
    name.len() >= n
        && name
            .get(name.len() - n..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(TUNNEL_NAME_SUFFIX))
}

/// Amortized cone sampler: a single cast every `frames_per_sample` frames.
#[derive(Debug, Clone)]
pub struct ConeSampler {
    samples: VecDeque<f32>,
    frame: u64,
    next_index: u32,
}

impl Default for ConeSampler {
    fn default() -> Self {
        Self { samples: VecDeque::new(), frame: 0, next_index: 0 }
    }
}

impl ConeSampler {
    /// Direction of sample `i`: golden-angle spiral over the cap of half-angle `half_angle`.
    pub fn direction(i: u32, half_angle: f32) -> Vec3 {
        let cos_half = half_angle.cos();
        let u = (i as f32 * GOLDEN_FRACTION).fract();
        let cos_t = 1.0 - u * (1.0 - cos_half);
        let sin_t = (1.0 - cos_t * cos_t).max(0.0).sqrt();
        let phi = i as f32 * GOLDEN_ANGLE;
        Vec3::new(sin_t * phi.cos(), cos_t, sin_t * phi.sin())
    }

    /// Advances one frame; casts when this frame is due. Returns the sample taken, if any.
    pub fn tick(&mut self, caster: &impl WorldCaster, origin: Vec3, cfg: &SamplerTuning) -> Option<f32> {
        let every = u64::from(cfg.frames_per_sample.max(1));
        self.frame += 1;
        if self.frame % every != 0 {
            return None;
        }
        let dir = Self::direction(self.next_index, cfg.cone_angle_deg.to_radians() * 0.5);
        self.next_index = self.next_index.wrapping_add(1);
        let weight = caster
            .cast_all(origin, dir, 0.0, cfg.cone_max_distance)
            .first()
            .map_or(0.0, |hit| if is_tunnel_surface(&hit.name) { 1.0 } else { 0.0 });
        self.push(weight, cfg.buffer_size);
        Some(weight)
    }

    pub fn push(&mut self, weight: f32, capacity: usize) {
        let capacity = capacity.max(1);
        self.samples.push_back(weight);
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        (self.samples.iter().sum::<f32>() / self.samples.len() as f32).clamp(0.0, 1.0)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Fraction of radial upward casts that pass through a tunnel surface.
pub fn radial_coverage(caster: &impl WorldCaster, observer: Vec3, cfg: &SamplerTuning) -> f32 {
    if cfg.radial_count == 0 {
        return 0.0;
    }
    let start = observer + Vec3::Y * cfg.radial_start_offset;
    let hits = (0..cfg.radial_count)
        .filter(|i| {
            let ang = *i as f32 / cfg.radial_count as f32 * TAU;
            let dir = (Vec3::Y + Vec3::new(ang.cos(), 0.0, ang.sin()) * cfg.radial_spread).normalize();
            caster
                .cast_all(start, dir, cfg.cast_radius.max(0.0), cfg.radial_length)
                .iter()
                .any(|h| is_tunnel_surface(&h.name))
        })
        .count();
    (hits as f32 / cfg.radial_count as f32).clamp(0.0, 1.0)
}

/// Latest fused reading for the tunnel state machine.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct PresenceReading {
    pub cone: f32,
    pub radial: f32,
    pub raw: f32,
}
impl PresenceReading {
    pub fn fuse(cone: f32, radial: f32) -> Self {
        let (cone, radial) = (cone.clamp(0.0, 1.0), radial.clamp(0.0, 1.0));
        Self { cone, radial, raw: cone.max(radial) }
    }
}

#[derive(Resource, Debug, Default)]
pub struct PresenceProbe {
    pub cone: ConeSampler,
}

/// `WorldCaster` over the rapier query pipeline. Surface names come from `name_of`.
pub struct RapierCaster<'a, N: Fn(Entity) -> String> {
    pub ctx: &'a RapierContext,
    pub name_of: N,
}

impl<N: Fn(Entity) -> String> WorldCaster for RapierCaster<'_, N> {
    fn cast_all(&self, origin: Vec3, dir: Vec3, radius: f32, max_distance: f32) -> Vec<CastHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Vec::new();
        }
        let mut hits = Vec::new();
        if radius <= 0.0 {
            self.ctx.intersections_with_ray(origin, dir, max_distance, true, QueryFilter::default(), |entity, hit| {
                hits.push(CastHit { distance: hit.time_of_impact, name: (self.name_of)(entity) });
                true
            });
        } else {
            // Rapier only reports the first shape hit; sweep again past every collider found.
            let ball = Collider::ball(radius);
            let mut seen: Vec<Entity> = Vec::new();
            while seen.len() < MAX_SHAPE_HITS {
                let unseen = |e: Entity| !seen.contains(&e);
                let filter = QueryFilter::default().predicate(&unseen);
                let options = ShapeCastOptions::with_max_time_of_impact(max_distance);
                let Some((entity, hit)) = self.ctx.cast_shape(origin, Quat::IDENTITY, dir, &ball, options, filter) else {
                    break;
                };
                hits.push(CastHit { distance: hit.time_of_impact, name: (self.name_of)(entity) });
                seen.push(entity);
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

pub struct PresencePlugin;
impl Plugin for PresencePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PresenceReading>()
            .init_resource::<PresenceProbe>()
            .add_systems(Update, sample_presence.in_set(LightingSet::Sample));
    }
}

fn sample_presence(
    settings: Option<Res<LightingSettings>>,
    observer: Res<ObserverPosition>,
    ctx: Option<Res<RapierContext>>,
    q_names: Query<&Name>,
    q_parents: Query<&Parent>,
    mut probe: ResMut<PresenceProbe>,
    mut reading: ResMut<PresenceReading>,
) {
    // Without a physics world the reading belongs to whoever else writes it.
    let Some(ctx) = ctx else { return; };
    let (Some(settings), Some(pos)) = (settings, observer.get()) else {
        *reading = PresenceReading::default();
        return;
    };
    if !settings.enable_tunnel_darkness {
        probe.cone.clear();
        *reading = PresenceReading::default();
        return;
    }

    // Colliders are often unnamed children of a named mesh.
    let name_of = |e: Entity| {
        q_names
            .get(e)
            .ok()
            .or_else(|| q_parents.get(e).ok().and_then(|p| q_names.get(p.get()).ok()))
            .map(|n| n.as_str().to_owned())
            .unwrap_or_default()
    };
    let caster = RapierCaster { ctx: &ctx, name_of };

    let cfg = &settings.sampler;
    let cone_origin = pos + Vec3::Y * settings.tunnel.sampler_offset_y;
    probe.cone.tick(&caster, cone_origin, cfg);
    let radial = radial_coverage(&caster, pos, cfg);
    *reading = PresenceReading::fuse(probe.cone.average(), radial);
}
