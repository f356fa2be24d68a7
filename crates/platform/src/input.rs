//! Keyboard and mouse state, turned into camera commands once per tick.
//!
//! Bindings:
//! - W/S move forward/backward, A/D strafe
//! - Q/E roll
//! - Mouse motion yaws (x) and pitches (y)

use std::collections::HashSet;

use meshview_scene::CameraCommand;

pub use winit::keyboard::KeyCode;

/// Roll delta applied per tick while Q or E is held.
pub const ROLL_STEP: i32 = 2;

/// Tracks held keys and mouse motion between ticks.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently pressed keys
    pressed_keys: HashSet<KeyCode>,
    /// Unconsumed mouse motion, including sub-pixel remainders
    mouse_delta: (f64, f64),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        self.pressed_keys.insert(key);
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    /// Accumulates raw mouse motion.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Drains this tick's input into camera commands.
    ///
    /// Whole-pixel mouse motion is consumed; the fractional part carries
    /// over to the next tick.
    pub fn take_camera_commands(&mut self) -> Vec<CameraCommand> {
        let mut commands = Vec::new();

        let moves = [
            (KeyCode::KeyW, CameraCommand::MoveForward),
            (KeyCode::KeyS, CameraCommand::MoveBackward),
            (KeyCode::KeyA, CameraCommand::MoveLeft),
            (KeyCode::KeyD, CameraCommand::MoveRight),
        ];
        commands.extend(
            moves
                .into_iter()
                .filter(|(key, _)| self.is_key_pressed(*key))
                .map(|(_, command)| command),
        );

        let yaw = self.mouse_delta.0.trunc();
        let pitch = self.mouse_delta.1.trunc();
        self.mouse_delta.0 -= yaw;
        self.mouse_delta.1 -= pitch;

        if yaw != 0.0 {
            commands.push(CameraCommand::Yaw(yaw as i32));
        }
        // Screen y grows downward; moving the mouse up looks up.
        if pitch != 0.0 {
            commands.push(CameraCommand::Pitch(-(pitch as i32)));
        }

        match (
            self.is_key_pressed(KeyCode::KeyQ),
            self.is_key_pressed(KeyCode::KeyE),
        ) {
            (true, false) => commands.push(CameraCommand::Roll(-ROLL_STEP)),
            (false, true) => commands.push(CameraCommand::Roll(ROLL_STEP)),
            _ => {}
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_input_produces_nothing() {
        let mut input = InputState::new();
        assert!(input.take_camera_commands().is_empty());
    }

    #[test]
    fn test_held_keys_repeat_every_tick() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        input.on_key_pressed(KeyCode::KeyD);
        for _ in 0..3 {
            assert_eq!(
                input.take_camera_commands(),
                vec![CameraCommand::MoveForward, CameraCommand::MoveRight]
            );
        }
        input.on_key_released(KeyCode::KeyW);
        assert_eq!(
            input.take_camera_commands(),
            vec![CameraCommand::MoveRight]
        );
    }

    #[test]
    fn test_unbound_keys_produce_no_commands() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::Escape);
        assert!(input.take_camera_commands().is_empty());
        assert!(input.is_key_pressed(KeyCode::Escape));
    }

    #[test]
    fn test_mouse_motion_maps_to_yaw_and_pitch() {
        let mut input = InputState::new();
        input.on_mouse_motion(3.0, 2.0);
        input.on_mouse_motion(2.0, -7.0);
        assert_eq!(
            input.take_camera_commands(),
            vec![CameraCommand::Yaw(5), CameraCommand::Pitch(5)]
        );
        assert!(input.take_camera_commands().is_empty());
    }

    #[test]
    fn test_sub_pixel_motion_carries_over() {
        let mut input = InputState::new();
        input.on_mouse_motion(0.75, 0.0);
        assert!(input.take_camera_commands().is_empty());
        input.on_mouse_motion(0.5, 0.0);
        assert_eq!(input.take_camera_commands(), vec![CameraCommand::Yaw(1)]);
    }

    #[test]
    fn test_opposing_roll_keys_cancel() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyQ);
        assert_eq!(
            input.take_camera_commands(),
            vec![CameraCommand::Roll(-ROLL_STEP)]
        );
        input.on_key_pressed(KeyCode::KeyE);
        assert!(input.take_camera_commands().is_empty());
    }
}
