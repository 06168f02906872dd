use bevy::hierarchy::HierarchyQueryExt;
use bevy::prelude::*;

use crate::plugins::core_sim::LightingSet;

/// The distinguished viewpoint; preferred over every other source.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ObserverCamera;

/// The controlled subject (second choice when no observer camera exists).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// A container the observer can sit in. Sampling happens `seat_height` above its origin.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Vehicle {
    pub seat_height: f32,
}

/// Where the observer was found this frame; `None` suspends spatial logic for the tick.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct ObserverPosition(pub Option<Vec3>);
impl ObserverPosition {
    pub fn get(&self) -> Option<Vec3> {
        self.0
    }
}

/// One resolved candidate: the entity, its world position and the vehicle it sits in, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub position: Vec3,
    pub vehicle: Option<(Vec3, Vehicle)>,
}

/// Candidates gathered from the world, highest priority first.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObserverCandidates {
    pub main_camera: Option<Sighting>,
    pub player: Option<Sighting>,
    pub any_camera: Option<Sighting>,
}

pub fn resolve_observer(c: &ObserverCandidates) -> Option<Vec3> {
    let s = c.main_camera.or(c.player).or(c.any_camera)?;
    Some(match s.vehicle {
        Some((origin, v)) => origin + Vec3::Y * v.seat_height,
        None => s.position,
    })
}

pub struct ObserverPlugin;
impl Plugin for ObserverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ObserverPosition>()
            .add_systems(Update, locate_observer.in_set(LightingSet::Locate));
    }
}

fn locate_observer(
    q_main: Query<(Entity, &GlobalTransform), With<ObserverCamera>>,
    q_player: Query<(Entity, &GlobalTransform), (With<Player>, Without<ObserverCamera>)>,
    q_cams: Query<(Entity, &Camera, &GlobalTransform)>,
    q_parents: Query<&Parent>,
    q_vehicles: Query<(&Vehicle, &GlobalTransform)>,
    mut observer: ResMut<ObserverPosition>,
) {
    let sight = |(e, t): (Entity, &GlobalTransform)| Sighting {
        position: t.translation(),
        vehicle: std::iter::once(e)
            .chain(q_parents.iter_ancestors(e))
            .find_map(|a| q_vehicles.get(a).ok())
            .map(|(v, vt)| (vt.translation(), *v)),
    };

    let candidates = ObserverCandidates {
        main_camera: q_main.iter().next().map(sight),
        player: q_player.iter().next().map(sight),
        any_camera: q_cams
            .iter()
            .find(|(_, cam, _)| cam.is_active)
            .map(|(e, _, t)| sight((e, t))),
    };

    let pos = resolve_observer(&candidates);
    if observer.0 != pos {
        observer.0 = pos;
    }
}
