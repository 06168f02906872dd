//! Library entry for integration tests & hosts embedding the lighting plugins.
//! Exposes plugin modules and a prelude for common types.

pub mod plugins {
    pub mod core_sim;
    pub mod settings;
    pub mod baseline;
    pub mod observer;
    pub mod classify;
    pub mod bubble;
    pub mod presence;
    pub mod tunnel;
    pub mod render_sync;
    pub mod overhaul;
    pub mod demo_scene;
}
pub mod prelude;
