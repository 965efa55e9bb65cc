// Alert model types: identifiers, kinds, display positions and the alert entry itself.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::core::error::Error;

/// Unique identifier for a live alert.
///
/// Drawn from a process-wide counter, so ids never collide even when many
/// alerts are created within the same clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertId(u64);

impl AlertId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

/// Kind of alert; drives the tone and the renderer's styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AlertKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
    Loading,
    Special,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Loading => "loading",
            Self::Special => "special",
        }
    }

    /// Capitalized name, used as the title when an alert has none.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Info => "Info",
            Self::Loading => "Loading",
            Self::Special => "Special",
        }
    }

    pub fn all() -> &'static [AlertKind] {
        &[
            Self::Success,
            Self::Error,
            Self::Warning,
            Self::Info,
            Self::Loading,
            Self::Special,
        ]
    }
}

/// Lenient parse: anything unrecognized becomes `Info`.
impl From<&str> for AlertKind {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "info" => Self::Info,
            "loading" => Self::Loading,
            "special" => Self::Special,
            _ => {
                log::debug!("Unknown alert kind {:?}, falling back to info", value);
                Self::Info
            }
        }
    }
}

impl From<String> for AlertKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screen anchor where the renderer stacks alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    #[default]
    TopRight,
    TopCenter,
    BottomLeft,
    BottomRight,
    BottomCenter,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::TopCenter => "top-center",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::BottomCenter => "bottom-center",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TopLeft => "Top Left",
            Self::TopRight => "Top Right",
            Self::TopCenter => "Top Center",
            Self::BottomLeft => "Bottom Left",
            Self::BottomRight => "Bottom Right",
            Self::BottomCenter => "Bottom Center",
        }
    }

    /// Selection order offered to the user.
    pub fn all() -> &'static [Position] {
        &[
            Self::TopRight,
            Self::TopLeft,
            Self::TopCenter,
            Self::BottomRight,
            Self::BottomLeft,
            Self::BottomCenter,
        ]
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidPosition(s.to_string()))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a consumer-supplied action handler.
pub type ActionResult = Result<(), Box<dyn StdError + Send + Sync>>;

/// Consumer-supplied callback behind an action button.
pub type ActionHandler = Arc<dyn Fn() -> ActionResult + Send + Sync>;

/// A labelled user action attached to an alert.
#[derive(Clone, Serialize)]
pub struct AlertAction {
    pub label: String,
    #[serde(skip)]
    pub handler: ActionHandler,
}

impl AlertAction {
    pub fn new<F>(label: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> ActionResult + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A live alert entry, as handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub title: Option<String>,
    pub message: String,
    pub created_at: DateTime<Local>,
    /// 0 = sticky
    pub duration_ms: u64,
    /// `None` for sticky alerts
    pub remaining_percent: Option<f64>,
    pub actions: Vec<AlertAction>,
}

impl Alert {
    /// Title to render: the explicit title, or the kind's name.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.kind.display_name())
    }

    /// `HH:MM` label shown next to the title.
    pub fn time_label(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }

    pub fn is_sticky(&self) -> bool {
        self.duration_ms == 0
    }
}

/// Everything a producer supplies to `enqueue`.
#[derive(Debug, Clone)]
pub struct AlertSpec {
    pub kind: AlertKind,
    pub message: String,
    pub title: Option<String>,
    /// `None` uses the store's default duration
    pub duration_ms: Option<u64>,
    pub actions: Vec<AlertAction>,
}

impl AlertSpec {
    pub fn new(kind: impl Into<AlertKind>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            title: None,
            duration_ms: None,
            actions: Vec::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Info, message)
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Loading, message)
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Keeps the alert until it is dismissed explicitly.
    #[must_use]
    pub fn sticky(self) -> Self {
        self.duration_ms(0)
    }

    #[must_use]
    pub fn action(mut self, action: AlertAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Partial update merged into a live alert. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AlertPatch {
    pub kind: Option<AlertKind>,
    /// `Some(None)` drops the title so the kind's name shows instead
    pub title: Option<Option<String>>,
    pub message: Option<String>,
    pub duration_ms: Option<u64>,
    pub actions: Option<Vec<AlertAction>>,
}

impl AlertPatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<AlertKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    #[must_use]
    pub fn clear_title(mut self) -> Self {
        self.title = Some(None);
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: Vec<AlertAction>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub(crate) fn apply(self, alert: &mut Alert) {
        if let Some(kind) = self.kind {
            alert.kind = kind;
        }
        if let Some(title) = self.title {
            alert.title = title;
        }
        if let Some(message) = self.message {
            alert.message = message;
        }
        if let Some(duration_ms) = self.duration_ms {
            alert.duration_ms = duration_ms;
        }
        if let Some(actions) = self.actions {
            alert.actions = actions;
        }
    }
}

/// Global display configuration held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub sound_enabled: bool,
    pub position: Position,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            position: Position::TopRight,
        }
    }
}
