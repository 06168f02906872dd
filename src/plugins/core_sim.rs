use bevy::prelude::*;

// Frame clock shared by every lighting system. Blend, dwell and refresh timers are all
// measured against `now`, never against Bevy's virtual (pausable) time.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct SimClock {
    pub tick: u64,
    pub now: f32,
    pub delta: f32,
    /// When set, `sync_clock` leaves the clock alone and the owner advances it.
    pub manual: bool,
}
impl SimClock {
    pub fn manual() -> Self {
        Self { manual: true, ..default() }
    }

    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.delta = dt.max(0.0);
        self.now += self.delta;
    }

    pub fn since(&self, t: f32) -> f32 {
        self.now - t
    }
}

/// System sets for the lighting frame, in execution order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightingSet {
    Clock,
    Locate,
    Sample,
    Decide,
    Apply,
}

pub struct CoreSimPlugin;
impl Plugin for CoreSimPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimClock>() // respect a pre-inserted manual clock
            .configure_sets(
                Update,
                (
                    LightingSet::Clock,
                    LightingSet::Locate,
                    LightingSet::Sample,
                    LightingSet::Decide,
                    LightingSet::Apply,
                )
                    .chain(),
            )
            .add_systems(Update, sync_clock.in_set(LightingSet::Clock));
    }
}

fn sync_clock(real: Res<Time<Real>>, mut clock: ResMut<SimClock>) {
    if clock.manual {
        return;
    }
    clock.tick += 1;
    clock.delta = real.delta_seconds();
    clock.now = real.elapsed_seconds();
}
