// Alert store - the single owner of live alerts and display configuration.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Local;
use tokio::runtime::Handle;
use tokio::time::Instant;

use super::model::{ActionHandler, Alert, AlertId, AlertPatch, AlertSpec, DisplayConfig, Position};
use super::scheduler::{Scheduler, TickTarget};
use super::sound::SoundEngine;
use crate::core::config::AlertSettings;
use crate::core::error::{Error, Result};

struct StoreState {
    /// Live alerts, oldest first
    alerts: Vec<Alert>,
    config: DisplayConfig,
    scheduler: Scheduler,
}

impl StoreState {
    fn position_of(&self, id: AlertId) -> Option<usize> {
        self.alerts.iter().position(|a| a.id == id)
    }

    fn alert_mut(&mut self, id: AlertId) -> Option<&mut Alert> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }

    /// Cancel first, then drop the entry, so a pending tick can never fire
    /// against a removed alert.
    fn remove_entry(&mut self, id: AlertId) -> bool {
        self.scheduler.cancel(id);
        match self.position_of(id) {
            Some(index) => {
                self.alerts.remove(index);
                true
            }
            None => false,
        }
    }
}

struct Shared {
    state: Mutex<StoreState>,
    sound: SoundEngine,
    default_duration_ms: u64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TickTarget for Shared {
    fn on_tick(&self, id: AlertId) -> ControlFlow<()> {
        let mut state = self.lock();

        let Some(duration_ms) = state.alert_mut(id).map(|a| a.duration_ms) else {
            // Already gone: retire whatever countdown is still registered.
            state.scheduler.cancel(id);
            return ControlFlow::Break(());
        };
        let duration = Duration::from_millis(duration_ms);
        let Some(remaining) = state.scheduler.remaining_percent(id, duration, Instant::now()) else {
            return ControlFlow::Break(());
        };

        if remaining <= 0.0 {
            state.remove_entry(id);
            log::debug!("Alert {} expired after {}ms", id, duration_ms);
            return ControlFlow::Break(());
        }

        if let Some(alert) = state.alert_mut(id) {
            // Never let a late tick raise the bar.
            let current = alert.remaining_percent.unwrap_or(100.0);
            alert.remaining_percent = Some(remaining.min(current));
        }
        ControlFlow::Continue(())
    }
}

/// Canonical in-memory alert state.
///
/// Cloning yields another handle to the same store. Construct one per session
/// and hand clones to whatever needs to produce or render alerts.
#[derive(Clone)]
pub struct AlertStore {
    shared: Arc<Shared>,
}

impl AlertStore {
    /// Create a store bound to the current tokio runtime.
    ///
    /// # Panics
    /// When called outside a tokio runtime. A store without a runtime cannot
    /// time anything, so this fails at construction rather than at the first
    /// timed alert.
    pub fn new(settings: &AlertSettings, sound: SoundEngine) -> Self {
        Self::with_runtime(Handle::current(), settings, sound)
    }

    pub fn with_runtime(runtime: Handle, settings: &AlertSettings, sound: SoundEngine) -> Self {
        let state = StoreState {
            alerts: Vec::new(),
            config: DisplayConfig {
                sound_enabled: settings.sound_enabled,
                position: settings.position,
            },
            scheduler: Scheduler::new(runtime, settings.tick_interval()),
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                sound,
                default_duration_ms: settings.default_duration_ms,
            }),
        }
    }

    fn target(&self) -> Weak<dyn TickTarget> {
        let shared: Arc<dyn TickTarget> = self.shared.clone();
        Arc::downgrade(&shared)
    }

    /// Append a new alert and return its id.
    ///
    /// Plays the kind's tone when sound is enabled and starts a countdown when
    /// the duration is positive. Neither blocks.
    ///
    /// # Errors
    /// [`Error::EmptyMessage`] when the message is blank.
    pub fn enqueue(&self, spec: AlertSpec) -> Result<AlertId> {
        if spec.message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let id = AlertId::next();
        let duration_ms = spec.duration_ms.unwrap_or(self.shared.default_duration_ms);
        let alert = Alert {
            id,
            kind: spec.kind,
            title: spec.title,
            message: spec.message,
            created_at: Local::now(),
            duration_ms,
            remaining_percent: (duration_ms > 0).then_some(100.0),
            actions: spec.actions,
        };
        let kind = alert.kind;

        let sound_enabled = {
            let mut state = self.shared.lock();
            state.alerts.push(alert);
            if duration_ms > 0 {
                state.scheduler.start(id, self.target());
            }
            state.config.sound_enabled
        };

        if sound_enabled {
            self.shared.sound.play(kind);
        }
        log::debug!("Enqueued {} alert {} ({}ms)", kind, id, duration_ms);
        Ok(id)
    }

    /// Remove an alert. Returns false if it was not live.
    pub fn remove(&self, id: AlertId) -> bool {
        let removed = self.shared.lock().remove_entry(id);
        if removed {
            log::debug!("Removed alert {}", id);
        }
        removed
    }

    /// Merge `patch` into a live alert. Returns false if it was not live.
    ///
    /// Changing the duration restarts the countdown from full (or stops it
    /// when the new duration is 0). A paused countdown stays paused.
    pub fn update(&self, id: AlertId, patch: AlertPatch) -> bool {
        let mut state = self.shared.lock();
        let Some(alert) = state.alert_mut(id) else {
            return false;
        };

        let previous_duration = alert.duration_ms;
        patch.apply(alert);
        let duration_ms = alert.duration_ms;

        if duration_ms != previous_duration {
            if duration_ms == 0 {
                alert.remaining_percent = None;
                state.scheduler.cancel(id);
            } else {
                alert.remaining_percent = Some(100.0);
                state.scheduler.restart(id, self.target());
            }
        }
        true
    }

    /// Drop every alert and cancel every countdown.
    pub fn clear_all(&self) {
        let mut state = self.shared.lock();
        state.scheduler.cancel_all();
        let cleared = state.alerts.len();
        state.alerts.clear();
        log::debug!("Cleared {} alerts", cleared);
    }

    /// Snapshot of live alerts, oldest first.
    pub fn list(&self) -> Vec<Alert> {
        self.shared.lock().alerts.clone()
    }

    pub fn get(&self, id: AlertId) -> Option<Alert> {
        self.shared.lock().alerts.iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().alerts.is_empty()
    }

    /// Freeze an alert's countdown (e.g. while hovered). False if it has none.
    pub fn pause(&self, id: AlertId) -> bool {
        let mut state = self.shared.lock();
        if !state.scheduler.pause(id) {
            return false;
        }
        // Publish the frozen value now rather than on the next tick.
        let Some(duration_ms) = state.alert_mut(id).map(|a| a.duration_ms) else {
            return true;
        };
        let frozen = state.scheduler.remaining_percent(
            id,
            Duration::from_millis(duration_ms),
            Instant::now(),
        );
        if let (Some(alert), Some(frozen)) = (state.alert_mut(id), frozen) {
            let current = alert.remaining_percent.unwrap_or(100.0);
            alert.remaining_percent = Some(frozen.min(current));
        }
        true
    }

    pub fn resume(&self, id: AlertId) -> bool {
        self.shared.lock().scheduler.resume(id)
    }

    pub fn is_paused(&self, id: AlertId) -> bool {
        self.shared.lock().scheduler.is_paused(id)
    }

    /// Handler of the `index`th action on an alert, for the consumer to run.
    pub fn action_handler(&self, id: AlertId, index: usize) -> Option<ActionHandler> {
        let state = self.shared.lock();
        state
            .alerts
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| a.actions.get(index))
            .map(|action| action.handler.clone())
    }

    pub fn config(&self) -> DisplayConfig {
        self.shared.lock().config
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.shared.lock().config.sound_enabled = enabled;
    }

    pub fn set_position(&self, position: Position) {
        self.shared.lock().config.position = position;
    }

    #[cfg(test)]
    pub(crate) fn active_countdowns(&self) -> usize {
        self.shared.lock().scheduler.len()
    }
}
