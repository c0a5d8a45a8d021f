//! Notification sink.
//!
//! Every workflow outcome the user should see goes through a [`Notifier`]. Front ends decide how
//! to show it: the REST server logs it, the CLI prints it, tests record it.

use std::sync::Mutex;

pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_failure(&self, message: &str);
}

/// Forwards notifications to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!(target: "discharge::notify", "{message}");
    }

    fn notify_failure(&self, message: &str) {
        tracing::warn!(target: "discharge::notify", "{message}");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Failure(String),
}

/// Keeps every notification in order of arrival.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(
            &mut *self
                .notifications
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn failures(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Failure(message) => Some(message),
                Notification::Success(_) => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Success(message) => Some(message),
                Notification::Failure(_) => None,
            })
            .collect()
    }

    fn push(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.push(Notification::Success(message.to_string()));
    }

    fn notify_failure(&self, message: &str) {
        self.push(Notification::Failure(message.to_string()));
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify_success(&self, message: &str) {
        (**self).notify_success(message)
    }

    fn notify_failure(&self, message: &str) {
        (**self).notify_failure(message)
    }
}
