//! Keyboard steering of the character.
//!
//! - ArrowUp (held): walk forward and play the walk cycle
//! - ArrowLeft / ArrowRight (each key-down, including auto-repeat): turn
//! - R: reset the pose
//! - H: toggle helper visibility

use std::collections::HashMap;
use three_d::{Event, Key};

use crate::motion::Locomotion;
use crate::settings::MotionSettings;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Reset,
    ToggleHelpers,
}
impl Control {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::ArrowUp => Some(Self::ArrowUp),
            Key::ArrowDown => Some(Self::ArrowDown),
            Key::ArrowLeft => Some(Self::ArrowLeft),
            Key::ArrowRight => Some(Self::ArrowRight),
            Key::R => Some(Self::Reset),
            Key::H => Some(Self::ToggleHelpers),
            _ => None,
        }
    }
}


/// Discrete actions triggered by a key-down event
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Turn(f32),
    Reset,
    ToggleHelpers,
}


/// Pressed/released state per control
#[derive(Default, Debug)]
pub struct KeyTable {
    keys: HashMap<Control, bool>,
}
impl KeyTable {
    pub fn press(&mut self, control: Control) {
        self.keys.insert(control, true);
    }

    pub fn release(&mut self, control: Control) {
        self.keys.insert(control, false);
    }

    pub fn is_pressed(&self, control: Control) -> bool {
        self.keys.get(&control).copied().unwrap_or(false)
    }
}


pub struct Controls {
    keys: KeyTable,
    locomotion: Locomotion,
    walk: Locomotion,
    turn_step: f32,
}
impl Controls {
    pub fn new(motion: &MotionSettings) -> Self {
        Self {
            keys: KeyTable::default(),
            locomotion: Locomotion::STILL,
            walk: Locomotion {
                speed: motion.walk_speed,
                animation_rate: motion.walk_animation_rate,
            },
            turn_step: motion.turn_step,
        }
    }

    #[cfg(test)]
    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    pub fn locomotion(&self) -> Locomotion {
        self.locomotion
    }

    /// Updates the key table from the frame's keyboard events and returns the
    /// commands they trigger, in event order. Events already consumed by the GUI are skipped.
    pub fn handle_events(&mut self, events: &mut [Event]) -> Vec<Command> {
        let mut commands = Vec::new();
        for event in events.iter_mut() {
            match event {
                Event::KeyPress { kind, handled, .. } if !*handled => {
                    if let Some(control) = Control::from_key(*kind) {
                        *handled = true;
                        if let Some(command) = self.key_down(control) {
                            commands.push(command);
                        }
                    }
                }
                Event::KeyRelease { kind, handled, .. } if !*handled => {
                    if let Some(control) = Control::from_key(*kind) {
                        *handled = true;
                        self.key_up(control);
                    }
                }
                _ => {}
            }
        }
        commands
    }

    pub fn key_down(&mut self, control: Control) -> Option<Command> {
        self.keys.press(control);
        match control {
            Control::ArrowRight => Some(Command::Turn(-self.turn_step)),
            Control::ArrowLeft => Some(Command::Turn(self.turn_step)),
            Control::Reset => Some(Command::Reset),
            Control::ToggleHelpers => Some(Command::ToggleHelpers),
            Control::ArrowUp | Control::ArrowDown => None,
        }
    }

    pub fn key_up(&mut self, control: Control) {
        self.keys.release(control);
        if control == Control::ArrowUp {
            self.locomotion = Locomotion::STILL;
        }
    }

    /// Per-frame throttle: walking while ArrowUp is held, standing still otherwise
    pub fn poll(&mut self) -> Locomotion {
        self.locomotion = if self.keys.is_pressed(Control::ArrowUp) {
            self.walk
        } else {
            Locomotion::STILL
        };
        self.locomotion
    }
}
