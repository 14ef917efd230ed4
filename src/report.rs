use log::{error, info, warn};
use mockall::automock;

/// How an event should be presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// The heading of a step, e.g. "Running update hook".
    Title,
    Info,
    Success,
    /// Something non-fatal the user should notice, e.g. a skipped entity.
    Attention,
    Error,
}

/// Nesting level of an event. Derived for every nested step, never mutated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Depth(u8);

impl Depth {
    pub const ROOT: Depth = Depth(0);

    pub fn nested(self) -> Self {
        Depth(self.0.saturating_add(1))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

/// A progress or result event emitted by the core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub message: String,
    pub severity: Severity,
    pub depth: Depth,
}

impl Event {
    pub fn new(message: impl Into<String>, severity: Severity, depth: Depth) -> Self {
        Event {
            message: message.into(),
            severity,
            depth,
        }
    }

    pub fn title(message: impl Into<String>, depth: Depth) -> Self {
        Event::new(message, Severity::Title, depth)
    }

    pub fn info(message: impl Into<String>, depth: Depth) -> Self {
        Event::new(message, Severity::Info, depth)
    }

    pub fn success(message: impl Into<String>, depth: Depth) -> Self {
        Event::new(message, Severity::Success, depth)
    }

    pub fn attention(message: impl Into<String>, depth: Depth) -> Self {
        Event::new(message, Severity::Attention, depth)
    }

    pub fn error(message: impl Into<String>, depth: Depth) -> Self {
        Event::new(message, Severity::Error, depth)
    }
}

/// Receives the events of the core for rendering. The core never depends on
/// how (or whether) they are rendered.
#[automock]
pub trait Reporter {
    fn report(&self, event: &Event);
}

/// Renders events through the `log` facade, indented by depth.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &Event) {
        let indent = "  ".repeat(event.depth.level() as usize);
        let message = &event.message;
        match event.severity {
            Severity::Title | Severity::Info => info!("{indent}{message}"),
            Severity::Success => info!("{indent}{message} ✓"),
            Severity::Attention => warn!("{indent}{message}"),
            Severity::Error => error!("{indent}{message}"),
        }
    }
}
