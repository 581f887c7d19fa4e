//! User-facing notifications.
//!
//! The cart synchronizer absorbs persistence failures at its boundary and
//! reports them here instead of returning errors to callers. The display
//! layer owns rendering and dismissal; this module only defines the message
//! contract and a tracing-backed default sink.

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
}

/// A short human-readable message for the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    /// A success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    /// An error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    /// A warning notification.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Warning,
            message: message.into(),
        }
    }
}

/// Receives notifications emitted by the cart synchronizer.
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification to the display layer.
    fn notify(&self, notification: Notification);
}

/// Default sink that forwards notifications to `tracing`.
///
/// Useful for headless deployments and tests; interactive surfaces install
/// their own sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                tracing::info!(message = %notification.message, "notification");
            }
            NotificationKind::Warning => {
                tracing::warn!(message = %notification.message, "notification");
            }
            NotificationKind::Error => {
                tracing::error!(message = %notification.message, "notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(
            Notification::success("ok").kind,
            NotificationKind::Success
        );
        assert_eq!(Notification::error("no").kind, NotificationKind::Error);
        assert_eq!(
            Notification::warning("hm").kind,
            NotificationKind::Warning
        );
    }

    #[test]
    fn test_message_preserved() {
        let n = Notification::success("Item added to cart");
        assert_eq!(n.message, "Item added to cart");
    }
}
