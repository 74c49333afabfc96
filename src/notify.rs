//! Desktop notification capability.
//!
//! The sync engine only needs "show a start notice" and "update it to
//! finished". Everything else, including whether a notification daemon is
//! present at all, is this module's problem; download behavior never depends
//! on it.

/// Receiver for the start/finish bracketing of a pass.
///
/// Both methods have no-op defaults; implement what you need.
pub trait Notifier: Send + Sync {
    /// The first real (non-skipped) download of a pass has started.
    fn transfer_started(&self) {}

    /// The pass finished after at least one real download.
    fn transfer_finished(&self) {}
}

/// A null notifier that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNotifier;

impl Notifier for NoNotifier {}

#[cfg(feature = "notify")]
pub use desktop::DesktopNotifier;

#[cfg(feature = "notify")]
mod desktop {
    use std::sync::Mutex;

    use notify_rust::{Notification, NotificationHandle};

    use super::Notifier;

    const SUMMARY: &str = "cam-dl";

    /// Shows a "sync running" desktop notification on the first download and
    /// updates it in place to "sync finished" when the pass completes.
    #[derive(Default)]
    pub struct DesktopNotifier {
        handle: Mutex<Option<NotificationHandle>>,
    }

    impl DesktopNotifier {
        /// Creates a desktop notifier. No notification is shown until a
        /// download actually starts.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Notifier for DesktopNotifier {
        fn transfer_started(&self) {
            match Notification::new().summary(SUMMARY).body("Sync running...").show() {
                Ok(handle) => *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle),
                Err(e) => log::warn!("could not show desktop notification: {e}"),
            }
        }

        fn transfer_finished(&self) {
            let taken = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(mut handle) = taken {
                handle.summary(SUMMARY).body("Sync finished.");
                handle.update();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_notifier_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoNotifier>();
    }
}
