// Control surface - what an external renderer or settings panel talks to.
//
// Pure pass-through to the store; holds nothing but the store handle.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use super::model::{Alert, AlertId, Position};
use super::store::AlertStore;
use crate::core::error::Result;

/// Result of running an alert's action handler on behalf of the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The handler returned an error (already logged)
    Failed(String),
    /// The handler panicked (already logged)
    Panicked,
    /// No such alert or action
    Missing,
}

/// One entry of the position picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct ControlSnapshot {
    pub active_alerts: usize,
    pub sound_enabled: bool,
    pub position: Position,
    pub alerts: Vec<Alert>,
}

#[derive(Clone)]
pub struct ControlSurface {
    store: AlertStore,
}

impl ControlSurface {
    pub fn new(store: AlertStore) -> Self {
        Self { store }
    }

    pub fn alert_count(&self) -> usize {
        self.store.len()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.store.list()
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        let config = self.store.config();
        let alerts = self.store.list();
        ControlSnapshot {
            active_alerts: alerts.len(),
            sound_enabled: config.sound_enabled,
            position: config.position,
            alerts,
        }
    }

    pub fn sound_enabled(&self) -> bool {
        self.store.config().sound_enabled
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.store.set_sound_enabled(enabled);
    }

    /// Flip the sound flag and return the new value.
    pub fn toggle_sound(&self) -> bool {
        let enabled = !self.sound_enabled();
        self.store.set_sound_enabled(enabled);
        enabled
    }

    pub fn position(&self) -> Position {
        self.store.config().position
    }

    pub fn set_position(&self, position: Position) {
        self.store.set_position(position);
    }

    /// Set the position from its text value (`"bottom-left"` etc).
    ///
    /// # Errors
    /// [`crate::core::error::Error::InvalidPosition`] for unknown text; the
    /// stored position is left unchanged.
    pub fn set_position_str(&self, value: &str) -> Result<()> {
        let position = value.parse()?;
        self.store.set_position(position);
        Ok(())
    }

    pub fn position_options() -> Vec<PositionOption> {
        Position::all()
            .iter()
            .map(|p| PositionOption {
                value: p.as_str(),
                label: p.label(),
            })
            .collect()
    }

    pub fn clear_all(&self) {
        self.store.clear_all();
    }

    /// Close button.
    pub fn dismiss(&self, id: AlertId) -> bool {
        self.store.remove(id)
    }

    pub fn hover_start(&self, id: AlertId) -> bool {
        self.store.pause(id)
    }

    pub fn hover_end(&self, id: AlertId) -> bool {
        self.store.resume(id)
    }

    /// Run the `index`th action of an alert.
    ///
    /// Failures and panics are contained here: they are logged and reported,
    /// and the alert is left exactly as it was. The handler runs without any
    /// store lock held, so it may freely enqueue or dismiss alerts.
    pub fn invoke_action(&self, id: AlertId, index: usize) -> ActionOutcome {
        let Some(handler) = self.store.action_handler(id, index) else {
            return ActionOutcome::Missing;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler())) {
            Ok(Ok(())) => ActionOutcome::Completed,
            Ok(Err(e)) => {
                log::warn!("Action {} on alert {} failed: {}", index, id, e);
                ActionOutcome::Failed(e.to_string())
            }
            Err(_) => {
                log::error!("Action {} on alert {} panicked", index, id);
                ActionOutcome::Panicked
            }
        }
    }
}
