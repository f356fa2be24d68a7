//! Free-look camera driven by incremental rotations.
//!
//! The camera keeps a position and two unit vectors, `forward` and `up`.
//! Every operation updates that state and then immediately rewrites the
//! caller-owned view matrix with `look_at_rh(position, position + forward, up)`.
//!
//! Rotations are applied as in-plane updates of the two basis vectors
//! (e.g. pitch: `forward' = cos θ·forward + sin θ·up`). Repeating them
//! accumulates floating-point error; with [`CameraSettings::renormalize`]
//! set, forward is normalized and up is re-orthogonalized after every
//! rotation. With it cleared the raw update is kept and [`Camera::drift`]
//! reports how far the basis has wandered.
//!
//! # Example
//!
//! ```
//! use glam::Mat4;
//! use meshview_scene::camera::{Camera, CameraSettings};
//!
//! let mut view = Mat4::IDENTITY;
//! let mut camera = Camera::new(CameraSettings::default(), &mut view);
//! camera.move_forward(&mut view);
//! camera.yaw(25, &mut view);
//! assert!(camera.drift().max() < 1e-4);
//! ```

use glam::{Mat4, Vec3};

/// Default drift tolerance used by [`CameraDrift::exceeds`] callers.
pub const DRIFT_TOLERANCE: f32 = 1e-4;

/// Tunables for a [`Camera`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    /// Distance moved per move call
    pub speed: f32,
    /// Radians of rotation per unit of input delta
    pub mouse_sensitivity: f32,
    /// Re-orthonormalize the basis after every rotation
    pub renormalize: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            speed: 0.1,
            mouse_sensitivity: 0.01,
            renormalize: true,
        }
    }
}

/// A single camera operation, as produced by input handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraCommand {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Pitch(i32),
    Yaw(i32),
    Roll(i32),
}

/// How far a camera basis is from orthonormal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraDrift {
    /// `| |forward| - 1 |`
    pub forward_length: f32,
    /// `| |up| - 1 |`
    pub up_length: f32,
    /// `| forward · up |`
    pub orthogonality: f32,
}

impl CameraDrift {
    pub fn max(&self) -> f32 {
        self.forward_length
            .max(self.up_length)
            .max(self.orthogonality)
    }

    pub fn exceeds(&self, tolerance: f32) -> bool {
        self.max() > tolerance
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    settings: CameraSettings,
}

impl Camera {
    /// Camera at the origin looking down -Z with +Y up.
    pub fn new(settings: CameraSettings, view: &mut Mat4) -> Self {
        Self::with_basis(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, settings, view)
    }

    /// Camera with an explicit basis.
    ///
    /// `forward` and `up` are expected to be unit length and perpendicular.
    /// They are orthonormalized here only when `settings.renormalize` is set.
    pub fn with_basis(
        position: Vec3,
        forward: Vec3,
        up: Vec3,
        settings: CameraSettings,
        view: &mut Mat4,
    ) -> Self {
        let mut camera = Self {
            position,
            forward,
            up,
            settings,
        };
        if settings.renormalize {
            camera.orthonormalize();
        }
        camera.update_view(view);
        camera
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// `forward × up`
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up)
    }

    #[inline]
    pub fn settings(&self) -> CameraSettings {
        self.settings
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    /// Writes the current view matrix into `view`.
    pub fn update_view(&self, view: &mut Mat4) {
        *view = self.view_matrix();
    }

    pub fn move_forward(&mut self, view: &mut Mat4) {
        self.position += self.settings.speed * self.forward;
        self.update_view(view);
    }

    pub fn move_backward(&mut self, view: &mut Mat4) {
        self.position -= self.settings.speed * self.forward;
        self.update_view(view);
    }

    pub fn move_left(&mut self, view: &mut Mat4) {
        self.position -= self.settings.speed * self.right();
        self.update_view(view);
    }

    pub fn move_right(&mut self, view: &mut Mat4) {
        self.position += self.settings.speed * self.right();
        self.update_view(view);
    }

    /// Rotates forward and up together about the right axis.
    pub fn pitch(&mut self, delta: i32, view: &mut Mat4) {
        let (sin, cos) = self.angle(delta).sin_cos();
        let forward = cos * self.forward + sin * self.up;
        let up = cos * self.up - sin * self.forward;
        self.forward = forward;
        self.up = up;
        self.after_rotation(view);
    }

    /// Rotates forward about the up axis. Positive deltas turn right.
    pub fn yaw(&mut self, delta: i32, view: &mut Mat4) {
        let (sin, cos) = (-self.angle(delta)).sin_cos();
        let right = self.right();
        self.forward = cos * self.forward - sin * right;
        self.after_rotation(view);
    }

    /// Rotates up about the forward axis.
    pub fn roll(&mut self, delta: i32, view: &mut Mat4) {
        let (sin, cos) = self.angle(delta).sin_cos();
        let right = self.right();
        self.up = cos * self.up - sin * right;
        self.after_rotation(view);
    }

    pub fn apply(&mut self, command: CameraCommand, view: &mut Mat4) {
        match command {
            CameraCommand::MoveForward => self.move_forward(view),
            CameraCommand::MoveBackward => self.move_backward(view),
            CameraCommand::MoveLeft => self.move_left(view),
            CameraCommand::MoveRight => self.move_right(view),
            CameraCommand::Pitch(delta) => self.pitch(delta, view),
            CameraCommand::Yaw(delta) => self.yaw(delta, view),
            CameraCommand::Roll(delta) => self.roll(delta, view),
        }
    }

    /// Current deviation of the basis from orthonormal.
    pub fn drift(&self) -> CameraDrift {
        CameraDrift {
            forward_length: (self.forward.length() - 1.0).abs(),
            up_length: (self.up.length() - 1.0).abs(),
            orthogonality: self.forward.dot(self.up).abs(),
        }
    }

    #[inline]
    fn angle(&self, delta: i32) -> f32 {
        self.settings.mouse_sensitivity * delta as f32
    }

    fn after_rotation(&mut self, view: &mut Mat4) {
        if self.settings.renormalize {
            self.orthonormalize();
        }
        self.update_view(view);
    }

    /// Gram-Schmidt: keep forward's direction, make up perpendicular to it.
    fn orthonormalize(&mut self) {
        let forward = self.forward.normalize_or(Vec3::NEG_Z);
        let up = (self.up - forward * self.up.dot(forward))
            .normalize_or(forward.any_orthonormal_vector());
        self.forward = forward;
        self.up = up;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < EPS
    }

    fn camera() -> (Camera, Mat4) {
        let mut view = Mat4::ZERO;
        let camera = Camera::new(CameraSettings::default(), &mut view);
        (camera, view)
    }

    #[test]
    fn test_default_basis() {
        let (camera, _) = camera();
        assert_eq!(camera.position(), Vec3::ZERO);
        assert_eq!(camera.forward(), Vec3::NEG_Z);
        assert_eq!(camera.up(), Vec3::Y);
        assert_eq!(camera.right(), Vec3::X);
    }

    #[test]
    fn test_construction_writes_view() {
        let (camera, view) = camera();
        assert_eq!(view, camera.view_matrix());
        assert_eq!(
            view,
            Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
        );
    }

    #[test]
    fn test_every_operation_rewrites_view() {
        let (mut camera, _) = camera();
        let commands = [
            CameraCommand::MoveForward,
            CameraCommand::MoveBackward,
            CameraCommand::MoveLeft,
            CameraCommand::MoveRight,
            CameraCommand::Pitch(3),
            CameraCommand::Yaw(-4),
            CameraCommand::Roll(5),
        ];
        for command in commands {
            let mut view = Mat4::ZERO;
            camera.apply(command, &mut view);
            assert_eq!(view, camera.view_matrix(), "{:?} left the view stale", command);
        }
    }

    #[test]
    fn test_move_forward_uses_speed() {
        let (mut camera, mut view) = camera();
        camera.move_forward(&mut view);
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, -0.1)));
    }

    #[test]
    fn test_move_left_and_right() {
        let (mut camera, mut view) = camera();
        camera.move_left(&mut view);
        assert!(approx(camera.position(), Vec3::new(-0.1, 0.0, 0.0)));
        camera.move_right(&mut view);
        camera.move_right(&mut view);
        assert!(approx(camera.position(), Vec3::new(0.1, 0.0, 0.0)));
    }

    #[test]
    fn test_positive_yaw_turns_right() {
        let (mut camera, mut view) = camera();
        camera.yaw(10, &mut view);
        assert!(camera.forward().x > 0.0);
        assert!(approx(camera.up(), Vec3::Y));
    }

    #[test]
    fn test_positive_pitch_looks_up() {
        let (mut camera, mut view) = camera();
        camera.pitch(10, &mut view);
        assert!(camera.forward().y > 0.0);
        assert!(camera.up().z > 0.0);
    }

    #[test]
    fn test_roll_keeps_forward() {
        let (mut camera, mut view) = camera();
        camera.roll(20, &mut view);
        assert!(approx(camera.forward(), Vec3::NEG_Z));
        assert!(camera.up().x < 0.0);
    }

    #[test]
    fn test_drift_reports_skewed_basis() {
        let settings = CameraSettings {
            renormalize: false,
            ..CameraSettings::default()
        };
        let mut view = Mat4::IDENTITY;
        let camera = Camera::with_basis(
            Vec3::ZERO,
            Vec3::new(0.0, 0.1, -1.0),
            Vec3::Y,
            settings,
            &mut view,
        );
        let drift = camera.drift();
        assert!(drift.exceeds(DRIFT_TOLERANCE));
        assert!((drift.orthogonality - 0.1).abs() < EPS);
    }

    #[test]
    fn test_renormalize_repairs_skewed_basis() {
        let mut view = Mat4::IDENTITY;
        let camera = Camera::with_basis(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::new(0.0, 1.0, 0.5),
            CameraSettings::default(),
            &mut view,
        );
        assert!(!camera.drift().exceeds(DRIFT_TOLERANCE));
        assert!(approx(camera.forward(), Vec3::NEG_Z));
        assert!(approx(camera.up(), Vec3::Y));
    }
}
