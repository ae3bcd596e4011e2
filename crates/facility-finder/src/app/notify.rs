//! Notification delivery
//!
//! Every notification becomes an in-app toast and an entry in the history list.
//! On web, proximity notifications are also shown as browser notifications once
//! the user has granted permission (requested once at startup).

use facility_finder_lib::{Notification, NotificationSink, UserPrompt};
use std::time::Duration;

/// How long a toast stays on screen
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

/// Fade in/out time for toasts
const TOAST_FADE_SECS: f32 = 0.25;

/// Maximum number of entries kept in the history list
const MAX_HISTORY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToastKind {
    /// A proximity notification
    Notification,
    /// An informational message (e.g. "No restroom found.")
    Info,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub body: String,
    shown_at: instant::Instant,
}

impl Toast {
    /// Fade alpha (0.0 to 1.0) at `now`
    pub fn alpha(&self, now: instant::Instant) -> f32 {
        let elapsed = now.duration_since(self.shown_at).as_secs_f32();
        let total = TOAST_DURATION.as_secs_f32();
        if elapsed < TOAST_FADE_SECS {
            elapsed / TOAST_FADE_SECS
        } else if elapsed < total - TOAST_FADE_SECS {
            1.0
        } else if elapsed < total {
            (total - elapsed) / TOAST_FADE_SECS
        } else {
            0.0
        }
    }

    fn expired(&self, now: instant::Instant) -> bool {
        now.duration_since(self.shown_at) >= TOAST_DURATION
    }
}

/// In-app toasts plus notification history (and browser notifications on web)
#[derive(Default)]
pub struct Notifier {
    toasts: Vec<Toast>,
    history: Vec<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        #[cfg(target_arch = "wasm32")]
        browser::request_permission();
        Self::default()
    }

    fn push_toast(&mut self, kind: ToastKind, title: &str, body: &str) {
        self.toasts.push(Toast {
            kind,
            title: title.to_string(),
            body: body.to_string(),
            shown_at: instant::Instant::now(),
        });
    }

    /// Drop expired toasts and return the remaining ones, oldest first
    pub fn visible_toasts(&mut self, now: instant::Instant) -> &[Toast] {
        self.toasts.retain(|t| !t.expired(now));
        &self.toasts
    }

    /// Notifications delivered this session, newest last
    pub fn history(&self) -> &[Notification] {
        &self.history
    }

    pub fn has_toasts(&self) -> bool {
        !self.toasts.is_empty()
    }
}

impl NotificationSink for Notifier {
    fn notify(&mut self, notification: &Notification) {
        tracing::info!("{}: {}", notification.title, notification.body);
        self.push_toast(ToastKind::Notification, &notification.title, &notification.body);

        self.history.push(notification.clone());
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }

        #[cfg(target_arch = "wasm32")]
        browser::show(notification);
    }
}

impl UserPrompt for Notifier {
    fn inform(&mut self, message: &str) {
        tracing::debug!("Informing user: {}", message);
        self.push_toast(ToastKind::Info, "", message);
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use facility_finder_lib::Notification;
    use web_sys::NotificationPermission;

    /// Ask for notification permission if the user has not decided yet
    pub fn request_permission() {
        if web_sys::Notification::permission() != NotificationPermission::Default {
            return;
        }
        match web_sys::Notification::request_permission() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                match wasm_bindgen_futures::JsFuture::from(promise).await {
                    Ok(result) => {
                        tracing::info!("Notification permission: {:?}", result.as_string())
                    }
                    Err(e) => tracing::warn!("Notification permission request failed: {:?}", e),
                }
            }),
            Err(e) => tracing::warn!("Notifications not supported: {:?}", e),
        }
    }

    /// Show a browser notification when permission has been granted
    pub fn show(notification: &Notification) {
        if web_sys::Notification::permission() != NotificationPermission::Granted {
            return;
        }
        let options = web_sys::NotificationOptions::new();
        options.set_body(&notification.body);
        if let Err(e) = web_sys::Notification::new_with_options(&notification.title, &options) {
            tracing::warn!("Failed to show browser notification: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_records_history_and_toast() {
        let mut notifier = Notifier::default();
        notifier.notify(&Notification::new("Facility Nearby", "Restroom A (restroom) is nearby"));
        notifier.inform("No parking found.");

        assert_eq!(notifier.history().len(), 1);
        let toasts = notifier.visible_toasts(instant::Instant::now());
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].kind, ToastKind::Notification);
        assert_eq!(toasts[1].kind, ToastKind::Info);
        assert_eq!(toasts[1].body, "No parking found.");
    }

    #[test]
    fn test_toasts_expire() {
        let mut notifier = Notifier::default();
        notifier.inform("hello");
        let later = instant::Instant::now() + TOAST_DURATION + Duration::from_millis(1);
        assert!(notifier.visible_toasts(later).is_empty());
        assert!(!notifier.has_toasts());
    }

    #[test]
    fn test_toast_alpha_fades() {
        let mut notifier = Notifier::default();
        notifier.inform("hello");
        let toast = notifier.toasts[0].clone();
        let start = toast.shown_at;

        assert!(toast.alpha(start) < 0.01);
        assert_eq!(toast.alpha(start + Duration::from_secs(2)), 1.0);
        assert!(toast.alpha(start + TOAST_DURATION - Duration::from_millis(100)) < 1.0);
        assert_eq!(toast.alpha(start + TOAST_DURATION), 0.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut notifier = Notifier::default();
        for i in 0..(MAX_HISTORY + 5) {
            notifier.notify(&Notification::new("t", format!("{i}")));
        }
        assert_eq!(notifier.history().len(), MAX_HISTORY);
        assert_eq!(notifier.history()[0].body, "5");
    }
}
