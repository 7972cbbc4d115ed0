//! Ordered joystick store (§4.e).
//!
//! Grounded on `original_source/lib/LibDS-Legacy/src/joysticks.c` and
//! `include/DS_Joysticks.h` (parallel axis/button/POV arrays, reject an
//! all-zero-capability joystick), redesigned per spec.md §9 as one record
//! per joystick instead of raw parallel arrays.
//!
//! The safety invariant ("reads return neutral while the robot is
//! disabled") is threaded through as an explicit `enabled` parameter on the
//! read path rather than a hidden reference back to [`crate::config::ConfigStore`],
//! matching the "context parameter, not ambient global" redesign note.

use std::sync::Mutex;

use crate::event::{Event, EventQueue};

#[derive(Debug, Clone)]
pub struct JoystickState {
    axes: Vec<f32>,
    buttons: Vec<bool>,
    hats: Vec<i16>,
}

impl JoystickState {
    fn new(num_axes: usize, num_buttons: usize, num_hats: usize) -> JoystickState {
        JoystickState {
            axes: vec![0.0; num_axes],
            buttons: vec![false; num_buttons],
            hats: vec![0; num_hats],
        }
    }

    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    pub fn num_buttons(&self) -> usize {
        self.buttons.len()
    }

    pub fn num_hats(&self) -> usize {
        self.hats.len()
    }

    pub fn axes(&self) -> &[f32] {
        &self.axes
    }

    pub fn buttons(&self) -> &[bool] {
        &self.buttons
    }

    pub fn hats(&self) -> &[i16] {
        &self.hats
    }
}

const VALID_HAT_ANGLES: [i16; 9] = [-1, 0, 45, 90, 135, 180, 225, 270, 315];

pub struct JoystickStore {
    events: std::sync::Arc<EventQueue>,
    inner: Mutex<Vec<JoystickState>>,
}

impl JoystickStore {
    pub fn new(events: std::sync::Arc<EventQueue>) -> JoystickStore {
        JoystickStore {
            events,
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Empties the joystick array and begins a new epoch; emits a
    /// count-changed event.
    pub fn reset(&self) {
        let mut joysticks = self.inner.lock().unwrap();
        if !joysticks.is_empty() {
            joysticks.clear();
            self.events.push(Event::JoystickCountChanged(0));
        }
    }

    /// Appends a joystick with the given axis/hat/button counts, all
    /// initialized to neutral values. Rejects joysticks with zero of all
    /// three (no-op, no event).
    pub fn add(&self, num_axes: usize, num_hats: usize, num_buttons: usize) -> Option<usize> {
        if num_axes == 0 && num_hats == 0 && num_buttons == 0 {
            return None;
        }

        let mut joysticks = self.inner.lock().unwrap();
        joysticks.push(JoystickState::new(num_axes, num_buttons, num_hats));
        let idx = joysticks.len() - 1;
        self.events
            .push(Event::JoystickCountChanged(joysticks.len()));
        Some(idx)
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn axis_count(&self, js: usize) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(js)
            .map(|j| j.num_axes())
            .unwrap_or(0)
    }

    pub fn button_count(&self, js: usize) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(js)
            .map(|j| j.num_buttons())
            .unwrap_or(0)
    }

    pub fn hat_count(&self, js: usize) -> usize {
        self.inner
            .lock()
            .unwrap()
            .get(js)
            .map(|j| j.num_hats())
            .unwrap_or(0)
    }

    /// Bounds-checked write; silently ignored if `js`/`axis` is out of range.
    pub fn set_axis(&self, js: usize, axis: usize, value: f32) {
        let mut joysticks = self.inner.lock().unwrap();
        if let Some(joystick) = joysticks.get_mut(js) {
            if let Some(slot) = joystick.axes.get_mut(axis) {
                *slot = value.clamp(-1.0, 1.0);
            }
        }
    }

    pub fn set_button(&self, js: usize, button: usize, pressed: bool) {
        let mut joysticks = self.inner.lock().unwrap();
        if let Some(joystick) = joysticks.get_mut(js) {
            if let Some(slot) = joystick.buttons.get_mut(button) {
                *slot = pressed;
            }
        }
    }

    /// Bounds-checked write; silently ignored if out of range or if `angle`
    /// is not one of the nine valid hat angles.
    pub fn set_hat(&self, js: usize, hat: usize, angle: i16) {
        if !VALID_HAT_ANGLES.contains(&angle) {
            return;
        }
        let mut joysticks = self.inner.lock().unwrap();
        if let Some(joystick) = joysticks.get_mut(js) {
            if let Some(slot) = joystick.hats.get_mut(hat) {
                *slot = angle;
            }
        }
    }

    /// Returns the stored axis value only if `enabled` is true; otherwise
    /// the neutral value (0.0). Hard safety contract (§4.e).
    pub fn get_axis(&self, js: usize, axis: usize, enabled: bool) -> f32 {
        if !enabled {
            return 0.0;
        }
        self.inner
            .lock()
            .unwrap()
            .get(js)
            .and_then(|j| j.axes.get(axis).copied())
            .unwrap_or(0.0)
    }

    pub fn get_button(&self, js: usize, button: usize, enabled: bool) -> bool {
        if !enabled {
            return false;
        }
        self.inner
            .lock()
            .unwrap()
            .get(js)
            .and_then(|j| j.buttons.get(button).copied())
            .unwrap_or(false)
    }

    pub fn get_hat(&self, js: usize, hat: usize, enabled: bool) -> i16 {
        if !enabled {
            return 0;
        }
        self.inner
            .lock()
            .unwrap()
            .get(js)
            .and_then(|j| j.hats.get(hat).copied())
            .unwrap_or(0)
    }

    /// Returns a snapshot of a joystick's raw state regardless of `enabled`,
    /// for use by protocol encoders that need the true values to transmit
    /// (the safety gate applies to the embedder-facing read API, not to
    /// what actually goes out over the wire -- the robot disables its own
    /// outputs based on the `enabled` bit in the control packet).
    pub fn snapshot(&self, js: usize) -> Option<JoystickState> {
        self.inner.lock().unwrap().get(js).cloned()
    }

    pub fn snapshot_all(&self) -> Vec<JoystickState> {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    fn store() -> JoystickStore {
        JoystickStore::new(Arc::new(EventQueue::new(64)))
    }

    #[test]
    fn all_zero_joystick_rejected() {
        let store = store();
        assert_eq!(store.add(0, 0, 0), None);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn reads_neutral_when_disabled() {
        let store = store();
        store.add(4, 0, 10);
        store.set_axis(0, 0, 1.0);
        store.set_button(0, 2, true);
        assert_eq!(store.get_axis(0, 0, false), 0.0);
        assert_eq!(store.get_button(0, 2, false), false);
        assert_eq!(store.get_axis(0, 0, true), 1.0);
        assert!(store.get_button(0, 2, true));
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let store = store();
        store.add(2, 0, 2);
        store.set_axis(0, 99, 1.0); // ignored
        store.set_button(5, 0, true); // ignored (no such joystick)
        assert_eq!(store.get_axis(0, 0, true), 0.0);
    }

    #[test]
    fn invalid_hat_angle_is_ignored() {
        let store = store();
        store.add(0, 1, 0);
        store.set_hat(0, 0, 999);
        assert_eq!(store.get_hat(0, 0, true), 0);
        store.set_hat(0, 0, 225);
        assert_eq!(store.get_hat(0, 0, true), 225);
    }

    #[test]
    fn reset_begins_new_epoch() {
        let store = store();
        store.add(4, 0, 10);
        store.reset();
        assert_eq!(store.count(), 0);
    }
}
