//! Desktop status notifications via notify-rust (D-Bus).
//!
//! Visual counterpart to the spoken status phrases; every user-facing
//! failure gets both.

use notify_rust::Notification;
use tracing::{debug, warn};

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn notify(&self, summary: &str, body: &str) {
        if !self.enabled {
            return;
        }

        debug!("Notification: {summary}");

        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .icon("preferences-desktop-accessibility")
            .timeout(4000)
            .show()
        {
            warn!("Failed to show notification: {e}");
        }
    }
}
