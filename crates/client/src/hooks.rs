//! Lifecycle callbacks the session invokes on the UI layer
//!
//! All callbacks run on the session task and must not block. A hook that needs
//! to talk to the device keeps a cloned `SessionHandle` and spawns the request.

/// Full-screen overlay state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Connection lost or not yet established
    Connecting,
    /// Unrecoverable error, e.g. the socket could not be constructed
    Error(String),
}

/// UI collaborator of a `Session`
pub trait SessionHooks: Send + 'static {
    /// First socket of a session opened; bootstrap requests go here
    fn on_loaded(&mut self) {}

    /// Session torn down; stop timers and polling
    fn on_unloaded(&mut self) {}

    /// Whether the main UI is already shown
    fn is_ui_visible(&self) -> bool {
        true
    }

    /// Whether every section has its bootstrap data (display and pages)
    fn is_ui_ready(&self) -> bool {
        false
    }

    /// Hides the overlay and shows the main UI
    fn reveal_ui(&mut self) {}

    fn show_overlay(&mut self, _overlay: Overlay) {}

    /// A request failed for good; `name` identifies the action
    fn notify_failure(&mut self, name: &str) {
        tracing::warn!(request = name, "Request failed");
    }
}

/// Hooks that ignore every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl SessionHooks for NoopHooks {}
