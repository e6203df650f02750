//! Touchscreen monitoring using evdev.
//!
//! Finds the primary touchscreen, batches raw ABS/KEY events into whole
//! frames on SYN boundaries, scales them to logical screen coordinates,
//! and sends Down/Move/Up events to the service over a tokio channel.
//! Only the primary touch point is tracked.

use evdev::{AbsoluteAxisType, Device, EventType, InputEventKind, Key};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{SurfaceConfig, TouchConfig};
use crate::layout::Point;

/// Touch events after frame batching and axis scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Down(Point),
    Move(Point),
    Up,
}

/// Raw axis range → logical screen coordinate mapping.
#[derive(Debug, Clone, Copy)]
struct AxisScale {
    x_min: f32,
    x_span: f32,
    y_min: f32,
    y_span: f32,
    screen_width: f32,
    screen_height: f32,
}

impl AxisScale {
    fn map(&self, raw_x: i32, raw_y: i32) -> Point {
        let fx = ((raw_x as f32 - self.x_min) / self.x_span).clamp(0.0, 1.0);
        let fy = ((raw_y as f32 - self.y_min) / self.y_span).clamp(0.0, 1.0);
        Point::new(fx * self.screen_width, fy * self.screen_height)
    }
}

/// Values reported inside the current SYN frame.
#[derive(Default)]
struct PendingFrame {
    x: Option<i32>,
    y: Option<i32>,
    pressed: Option<bool>,
}

/// Primary-touch state carried across frames.
struct TouchTracker {
    down: bool,
    x: i32,
    y: i32,
}

pub struct TouchMonitor {
    scale: AxisScale,
    tx: mpsc::Sender<TouchEvent>,
}

impl TouchMonitor {
    pub fn new(config: &TouchConfig, surface: &SurfaceConfig, tx: mpsc::Sender<TouchEvent>) -> Self {
        let scale = AxisScale {
            x_min: config.axis_x_min,
            x_span: (config.axis_x_max - config.axis_x_min).max(1.0),
            y_min: config.axis_y_min,
            y_span: (config.axis_y_max - config.axis_y_min).max(1.0),
            screen_width: surface.screen_width,
            screen_height: surface.screen_height,
        };
        Self { scale, tx }
    }

    /// Find devices that look like touchscreens: absolute X/Y axes plus
    /// a BTN_TOUCH key.
    pub fn find_touchscreens() -> Vec<Device> {
        let mut screens = Vec::new();

        for (_path, device) in evdev::enumerate() {
            let has_position = device.supported_absolute_axes().map_or(false, |axes| {
                (axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y))
                    || (axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
                        && axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y))
            });
            let has_touch = device
                .supported_keys()
                .map_or(false, |keys| keys.contains(Key::BTN_TOUCH));

            if has_position && has_touch {
                info!(
                    "Found touchscreen: {} at {:?}",
                    device.name().unwrap_or("unknown"),
                    device.physical_path()
                );
                screens.push(device);
            }
        }

        screens
    }

    /// Monitor the primary touchscreen until it disconnects. With no
    /// touchscreen present this returns immediately; the service keeps
    /// running with key navigation only.
    pub async fn run(self) {
        let mut screens = Self::find_touchscreens();
        if screens.is_empty() {
            warn!(
                "No touchscreen found. Make sure you're in the 'input' group: \
                 sudo usermod -aG input $USER"
            );
            return;
        }

        let device = screens.remove(0);
        if !screens.is_empty() {
            debug!("Ignoring {} additional touch device(s)", screens.len());
        }
        Self::monitor_device(device, self.scale, self.tx).await;
    }

    async fn monitor_device(device: Device, scale: AxisScale, tx: mpsc::Sender<TouchEvent>) {
        let name = device.name().unwrap_or("unknown").to_string();
        debug!("Monitoring touchscreen {name}");

        let mut events = match device.into_event_stream() {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Cannot create event stream for {name}: {e}");
                return;
            }
        };

        let mut frame = PendingFrame::default();
        let mut tracker = TouchTracker {
            down: false,
            x: 0,
            y: 0,
        };

        loop {
            match events.next_event().await {
                Ok(event) => {
                    match event.kind() {
                        InputEventKind::AbsAxis(axis) => {
                            if axis == AbsoluteAxisType::ABS_X
                                || axis == AbsoluteAxisType::ABS_MT_POSITION_X
                            {
                                frame.x = Some(event.value());
                            } else if axis == AbsoluteAxisType::ABS_Y
                                || axis == AbsoluteAxisType::ABS_MT_POSITION_Y
                            {
                                frame.y = Some(event.value());
                            }
                        }
                        InputEventKind::Key(key) if key == Key::BTN_TOUCH => {
                            match event.value() {
                                1 => frame.pressed = Some(true),
                                0 => frame.pressed = Some(false),
                                _ => {}
                            }
                        }
                        _ => {
                            if event.event_type() == EventType::SYNCHRONIZATION {
                                Self::flush_frame(&mut frame, &mut tracker, &scale, &tx);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Touchscreen {name} disconnected: {e}");
                    break;
                }
            }
        }
    }

    /// Fold a completed SYN frame into the tracker and emit at most one
    /// event for it. try_send drops frames under backpressure; geometry
    /// ticks are only meaningful at their latest value.
    fn flush_frame(
        frame: &mut PendingFrame,
        tracker: &mut TouchTracker,
        scale: &AxisScale,
        tx: &mpsc::Sender<TouchEvent>,
    ) {
        let moved = frame.x.is_some() || frame.y.is_some();
        if let Some(x) = frame.x.take() {
            tracker.x = x;
        }
        if let Some(y) = frame.y.take() {
            tracker.y = y;
        }

        let event = match frame.pressed.take() {
            Some(true) if !tracker.down => {
                tracker.down = true;
                Some(TouchEvent::Down(scale.map(tracker.x, tracker.y)))
            }
            Some(false) if tracker.down => {
                tracker.down = false;
                Some(TouchEvent::Up)
            }
            _ if tracker.down && moved => {
                Some(TouchEvent::Move(scale.map(tracker.x, tracker.y)))
            }
            _ => None,
        };

        if let Some(event) = event {
            let _ = tx.try_send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> AxisScale {
        AxisScale {
            x_min: 0.0,
            x_span: 4095.0,
            y_min: 0.0,
            y_span: 4095.0,
            screen_width: 1280.0,
            screen_height: 800.0,
        }
    }

    #[test]
    fn axis_scaling_maps_corners_and_clamps() {
        let s = scale();
        assert_eq!(s.map(0, 0), Point::new(0.0, 0.0));
        assert_eq!(s.map(4095, 4095), Point::new(1280.0, 800.0));
        // out-of-range raw values clamp to the screen edge
        assert_eq!(s.map(-50, 9999), Point::new(0.0, 800.0));
    }

    #[test]
    fn frames_collapse_to_single_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let s = scale();
        let mut frame = PendingFrame::default();
        let mut tracker = TouchTracker {
            down: false,
            x: 0,
            y: 0,
        };

        // touch-down frame with coordinates
        frame.x = Some(2048);
        frame.y = Some(1024);
        frame.pressed = Some(true);
        TouchMonitor::flush_frame(&mut frame, &mut tracker, &s, &tx);
        assert!(matches!(rx.try_recv(), Ok(TouchEvent::Down(_))));

        // move frame: only x changed
        frame.x = Some(2100);
        TouchMonitor::flush_frame(&mut frame, &mut tracker, &s, &tx);
        assert!(matches!(rx.try_recv(), Ok(TouchEvent::Move(_))));

        // empty SYN frame while resting: no event
        TouchMonitor::flush_frame(&mut frame, &mut tracker, &s, &tx);
        assert!(rx.try_recv().is_err());

        // release frame
        frame.pressed = Some(false);
        TouchMonitor::flush_frame(&mut frame, &mut tracker, &s, &tx);
        assert!(matches!(rx.try_recv(), Ok(TouchEvent::Up)));
    }
}
