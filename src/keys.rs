//! Command key detection using evdev.
//!
//! Monitors all keyboards for the push-to-talk combo (hold to dictate)
//! and the single-key navigation commands. Sends commands over a tokio
//! channel; key auto-repeat drives held-key letter scanning.

use crate::config::KeysConfig;
use evdev::{Device, EventType, InputEventKind, Key};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Commands sent from the key monitor to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Push-to-talk combo went down: start capturing.
    DictateStart,
    /// Push-to-talk combo released: stop capturing and look up.
    DictateStop,
    /// Focus the next letter.
    Next,
    /// Focus the previous letter.
    Prev,
    /// Re-announce the current word.
    Repeat,
}

/// Resolve a key name like "KEY_LEFTMETA" to an evdev Key code.
fn resolve_key(name: &str) -> Option<Key> {
    let key = match name {
        "KEY_LEFTMETA" => Key::KEY_LEFTMETA,
        "KEY_RIGHTMETA" => Key::KEY_RIGHTMETA,
        "KEY_LEFTALT" => Key::KEY_LEFTALT,
        "KEY_RIGHTALT" => Key::KEY_RIGHTALT,
        "KEY_LEFTCTRL" => Key::KEY_LEFTCTRL,
        "KEY_RIGHTCTRL" => Key::KEY_RIGHTCTRL,
        "KEY_LEFTSHIFT" => Key::KEY_LEFTSHIFT,
        "KEY_RIGHTSHIFT" => Key::KEY_RIGHTSHIFT,
        "KEY_RIGHT" => Key::KEY_RIGHT,
        "KEY_LEFT" => Key::KEY_LEFT,
        "KEY_UP" => Key::KEY_UP,
        "KEY_DOWN" => Key::KEY_DOWN,
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_ENTER" => Key::KEY_ENTER,
        "KEY_TAB" => Key::KEY_TAB,
        "KEY_ESC" => Key::KEY_ESC,
        "KEY_HOME" => Key::KEY_HOME,
        "KEY_END" => Key::KEY_END,
        "KEY_PAGEUP" => Key::KEY_PAGEUP,
        "KEY_PAGEDOWN" => Key::KEY_PAGEDOWN,
        _ => {
            warn!("Unknown key name: {name}");
            return None;
        }
    };
    Some(key)
}

/// Pressed-key tracking shared across keyboard devices.
struct KeyState {
    pressed: HashSet<Key>,
    combo_active: bool,
}

pub struct KeyMonitor {
    combo: HashSet<Key>,
    next_key: Option<Key>,
    prev_key: Option<Key>,
    repeat_key: Option<Key>,
    state: Arc<Mutex<KeyState>>,
    tx: mpsc::Sender<KeyCommand>,
}

impl KeyMonitor {
    pub fn new(config: &KeysConfig, tx: mpsc::Sender<KeyCommand>) -> Self {
        let combo: HashSet<Key> = config
            .dictate_combo
            .iter()
            .filter_map(|s| resolve_key(s))
            .collect();
        if combo.is_empty() {
            warn!("No valid push-to-talk combo configured, dictation keys disabled");
        } else {
            info!("Push-to-talk combo: {} key(s)", combo.len());
        }

        Self {
            combo,
            next_key: resolve_key(&config.next_key),
            prev_key: resolve_key(&config.prev_key),
            repeat_key: resolve_key(&config.repeat_key),
            state: Arc::new(Mutex::new(KeyState {
                pressed: HashSet::new(),
                combo_active: false,
            })),
            tx,
        }
    }

    /// Find all keyboard input devices.
    pub fn find_keyboards() -> Vec<Device> {
        let mut keyboards = Vec::new();

        for (_path, device) in evdev::enumerate() {
            if let Some(keys) = device.supported_keys() {
                if keys.contains(Key::KEY_A) && keys.contains(Key::KEY_ENTER) {
                    info!(
                        "Found keyboard: {} at {:?}",
                        device.name().unwrap_or("unknown"),
                        device.physical_path()
                    );
                    keyboards.push(device);
                }
            }
        }

        keyboards
    }

    /// Map a single key event to a navigation command. Auto-repeat
    /// (value 2) counts so a held arrow key scans across the word.
    fn nav_command(&self, key: Key, value: i32) -> Option<KeyCommand> {
        if value != 1 && value != 2 {
            return None;
        }
        if Some(key) == self.next_key {
            Some(KeyCommand::Next)
        } else if Some(key) == self.prev_key {
            Some(KeyCommand::Prev)
        } else if Some(key) == self.repeat_key && value == 1 {
            Some(KeyCommand::Repeat)
        } else {
            None
        }
    }

    async fn monitor_device(self: Arc<Self>, device: Device) {
        let name = device.name().unwrap_or("unknown").to_string();
        debug!("Monitoring keyboard {name}");

        let mut events = match device.into_event_stream() {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Cannot create event stream for {name}: {e}");
                return;
            }
        };

        loop {
            match events.next_event().await {
                Ok(event) => {
                    if event.event_type() != EventType::KEY {
                        continue;
                    }
                    let key = match event.kind() {
                        InputEventKind::Key(k) => k,
                        _ => continue,
                    };
                    let value = event.value();

                    if let Some(command) = self.nav_command(key, value) {
                        let _ = self.tx.try_send(command);
                        continue;
                    }

                    if self.combo.is_empty() {
                        continue;
                    }

                    // 0 = release, 1 = press, 2 = repeat
                    let mut state = self.state.lock().unwrap();
                    match value {
                        1 => {
                            state.pressed.insert(key);
                        }
                        0 => {
                            state.pressed.remove(&key);
                        }
                        _ => continue,
                    }

                    let now_active = self.combo.is_subset(&state.pressed);
                    if now_active && !state.combo_active {
                        state.combo_active = true;
                        debug!("Push-to-talk pressed");
                        let _ = self.tx.try_send(KeyCommand::DictateStart);
                    } else if !now_active && state.combo_active {
                        state.combo_active = false;
                        debug!("Push-to-talk released");
                        let _ = self.tx.try_send(KeyCommand::DictateStop);
                    }
                }
                Err(e) => {
                    warn!("Keyboard {name} disconnected: {e}");
                    break;
                }
            }
        }
    }

    /// Start monitoring all keyboards. With none present, command keys
    /// stay disabled and the rest of the service keeps running.
    pub async fn run(self) {
        let keyboards = Self::find_keyboards();
        if keyboards.is_empty() {
            warn!(
                "No keyboards found. Make sure you're in the 'input' group: \
                 sudo usermod -aG input $USER"
            );
            return;
        }

        info!("Monitoring {} keyboard(s)", keyboards.len());

        let monitor = Arc::new(self);
        let mut handles = Vec::new();
        for device in keyboards {
            handles.push(tokio::spawn(Arc::clone(&monitor).monitor_device(device)));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> KeyMonitor {
        let (tx, _rx) = mpsc::channel(4);
        KeyMonitor::new(&KeysConfig::default(), tx)
    }

    #[test]
    fn arrow_keys_map_to_navigation_with_auto_repeat() {
        let m = monitor();
        assert_eq!(m.nav_command(Key::KEY_RIGHT, 1), Some(KeyCommand::Next));
        assert_eq!(m.nav_command(Key::KEY_RIGHT, 2), Some(KeyCommand::Next));
        assert_eq!(m.nav_command(Key::KEY_LEFT, 1), Some(KeyCommand::Prev));
        assert_eq!(m.nav_command(Key::KEY_RIGHT, 0), None);
    }

    #[test]
    fn repeat_fires_on_press_only() {
        let m = monitor();
        assert_eq!(m.nav_command(Key::KEY_SPACE, 1), Some(KeyCommand::Repeat));
        assert_eq!(m.nav_command(Key::KEY_SPACE, 2), None);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let m = monitor();
        assert_eq!(m.nav_command(Key::KEY_A, 1), None);
    }
}
