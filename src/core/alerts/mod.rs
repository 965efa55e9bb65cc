// Alert lifecycle module: transient notifications with countdowns and audio cues.
//
// Architecture:
// - model.rs: Alert entry, kinds, positions, specs and patches
// - scheduler.rs: Per-alert countdown tasks driving progress and expiry
// - sound.rs: Tone synthesis and the fire-and-forget audio thread
// - store.rs: Owns the ordered alert sequence and display config
// - control.rs: Read/write facade for renderers and settings panels

pub mod control;
pub mod model;
pub mod scheduler;
pub mod sound;
pub mod store;


pub use control::{ActionOutcome, ControlSnapshot, ControlSurface};
pub use model::{
    ActionHandler, ActionResult, Alert, AlertAction, AlertId, AlertKind, AlertPatch, AlertSpec,
    DisplayConfig, Position,
};
pub use sound::SoundEngine;
pub use store::AlertStore;
