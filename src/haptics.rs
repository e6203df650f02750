//! Vibration output via a sysfs timed-output device.
//!
//! Writing a millisecond count to the device file runs the motor for
//! that long. Pulses are best-effort fire-and-forget: a missing or
//! unwritable device disables haptics and everything else keeps running.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::HapticsConfig;
use crate::cursor::HapticKind;

const DEFAULT_DEVICE: &str = "/sys/class/timed_output/vibrator/enable";

pub struct HapticMotor {
    device: Option<PathBuf>,
    tick_ms: u32,
    weak_ms: u32,
    strong_ms: u32,
}

impl HapticMotor {
    pub fn new(config: &HapticsConfig) -> Self {
        let device = if !config.enabled {
            info!("Haptics disabled by config");
            None
        } else {
            let candidate = if config.device_path.is_empty() {
                PathBuf::from(DEFAULT_DEVICE)
            } else {
                PathBuf::from(&config.device_path)
            };
            if candidate.exists() {
                info!("Haptic device: {}", candidate.display());
                Some(candidate)
            } else {
                warn!(
                    "No haptic device at {}, vibration disabled",
                    candidate.display()
                );
                None
            }
        };

        Self {
            device,
            tick_ms: config.tick_ms,
            weak_ms: config.weak_ms,
            strong_ms: config.strong_ms,
        }
    }

    /// Fire one pulse. No ordering guarantee relative to speech.
    pub fn pulse(&self, kind: HapticKind) {
        let ms = match kind {
            HapticKind::Tick => self.tick_ms,
            HapticKind::Weak => self.weak_ms,
            HapticKind::Strong => self.strong_ms,
        };
        let Some(device) = &self.device else {
            return;
        };
        // pulses fire tens of times a second while scrubbing, so
        // failures log at debug to keep the journal readable
        if let Err(e) = fs::write(device, ms.to_string()) {
            debug!("Haptic pulse failed: {e}");
        }
    }
}
