//! Damped orbit camera around the middle of the pipeline.
//!
//! Input methods only queue motion; [`OrbitCamera::update`] applies a fraction of
//! the queued motion every tick so the view glides to a stop.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Vec3};

use crate::Scalar;

pub const HOME_EYE: Vec3 = Vec3::new(38.0, 15.0, 20.0);
/// Midpoint between the input layers (x = 0) and the output node (x = 46).
pub const HOME_TARGET: Vec3 = Vec3::new(23.0, 0.0, 0.0);

const PITCH_LIMIT: Scalar = FRAC_PI_2 - 0.01;
const REFERENCE_FPS: Scalar = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: Scalar,
    pub near: Scalar,
    pub far: Scalar,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: Scalar,
    pub pitch: Scalar,
    pub distance: Scalar,
    pub projection: Projection,
    pub min_distance: Scalar,
    pub max_distance: Scalar,
    /// Fraction of queued motion applied per 60 Hz frame.
    pub damping: Scalar,
    pub rotate_speed: Scalar,
    pub auto_rotate: bool,
    /// 2.0 completes one turn every 30 seconds.
    pub auto_rotate_speed: Scalar,
    pending_yaw: Scalar,
    pending_pitch: Scalar,
    pending_pan: Vec3,
    home_eye: Vec3,
    home_target: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(HOME_EYE, HOME_TARGET)
    }
}

impl OrbitCamera {
    /// Places the camera at `eye` orbiting `target`; this pose becomes the reset pose.
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            target,
            yaw: 0.0,
            pitch: 0.0,
            distance: 1.0,
            projection: Projection::default(),
            min_distance: 5.0,
            max_distance: 50.0,
            damping: 0.05,
            rotate_speed: 1.0,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_pan: Vec3::ZERO,
            home_eye: eye,
            home_target: target,
        };
        camera.set_pose(eye, target);
        camera
    }

    fn set_pose(&mut self, eye: Vec3, target: Vec3) {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        self.target = target;
        self.distance = distance;
        self.yaw = offset.x.atan2(offset.z);
        self.pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + Vec3::new(
                cos_pitch * sin_yaw,
                sin_pitch,
                cos_pitch * cos_yaw,
            ) * self.distance
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: Scalar) -> Mat4 {
        Mat4::perspective_rh(
            self.projection.fov_y_degrees.to_radians(),
            aspect.max(f32::EPSILON),
            self.projection.near,
            self.projection.far,
        )
    }

    pub fn view_projection(&self, aspect: Scalar) -> Mat4 {
        self.projection_matrix(aspect) * self.view()
    }

    /// Queues a rotation for a pointer drag of `(dx, dy)` pixels.
    ///
    /// Dragging across the full viewport height turns the camera a full circle.
    pub fn rotate_by_pixels(&mut self, dx: Scalar, dy: Scalar, viewport_height: Scalar) {
        let height = viewport_height.max(1.0);
        self.pending_yaw -= TAU * dx / height * self.rotate_speed;
        self.pending_pitch += TAU * dy / height * self.rotate_speed;
    }

    /// Queues a pan that keeps the point under the cursor roughly fixed.
    pub fn pan_by_pixels(&mut self, dx: Scalar, dy: Scalar, viewport_height: Scalar) {
        let height = viewport_height.max(1.0);
        let half_fov = (self.projection.fov_y_degrees.to_radians() / 2.0).tan();
        let world_per_pixel = 2.0 * self.distance * half_fov / height;

        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        self.pending_pan += (-right * dx + up * dy) * world_per_pixel;
    }

    /// Scroll `steps` notches; positive moves closer. Not damped.
    pub fn zoom(&mut self, steps: Scalar) {
        let scale = 0.95_f32.powf(steps);
        self.distance = (self.distance * scale).clamp(self.min_distance, self.max_distance);
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.auto_rotate = !self.auto_rotate;
        self.auto_rotate
    }

    /// Restores the pose the camera was created with and drops queued motion.
    pub fn reset(&mut self) {
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_pan = Vec3::ZERO;
        self.set_pose(self.home_eye, self.home_target);
    }

    /// Advances the camera by `dt` seconds.
    pub fn update(&mut self, dt: Scalar) {
        if self.auto_rotate {
            // Auto-rotation orbits left, so yaw decreases.
            self.yaw -= TAU / REFERENCE_FPS * self.auto_rotate_speed * dt;
        }

        let frames = (dt * REFERENCE_FPS).max(0.0);
        let keep = (1.0 - self.damping).powf(frames);
        let applied = 1.0 - keep;

        self.yaw += self.pending_yaw * applied;
        self.pitch = (self.pitch + self.pending_pitch * applied).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.target += self.pending_pan * applied;

        self.pending_yaw *= keep;
        self.pending_pitch *= keep;
        self.pending_pan *= keep;

        self.yaw = self.yaw.rem_euclid(TAU);
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    pub fn is_settled(&self) -> bool {
        !self.auto_rotate
            && self.pending_yaw.abs() < 1e-4
            && self.pending_pitch.abs() < 1e-4
            && self.pending_pan.length_squared() < 1e-8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_pose_round_trips() {
        let camera = OrbitCamera::default();
        assert!((camera.eye() - HOME_EYE).length() < 1e-4);
        assert_eq!(camera.target, HOME_TARGET);
        assert!((camera.distance - 850.0_f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.zoom(500.0);
        assert_eq!(camera.distance, 5.0);
        camera.zoom(-500.0);
        assert_eq!(camera.distance, 50.0);
    }

    #[test]
    fn damped_rotation_converges() {
        let mut camera = OrbitCamera::default();
        let start_yaw = camera.yaw;
        camera.rotate_by_pixels(-100.0, 0.0, 800.0);
        let expected = (start_yaw + TAU * 100.0 / 800.0).rem_euclid(TAU);

        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        assert!(camera.is_settled());
        assert!((camera.yaw - expected).abs() < 1e-3);
    }

    #[test]
    fn pitch_stays_off_the_poles() {
        let mut camera = OrbitCamera::default();
        camera.rotate_by_pixels(0.0, 10_000.0, 100.0);
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        assert!(camera.pitch <= PITCH_LIMIT + 1e-6);
        assert!(camera.eye().is_finite());
    }

    #[test]
    fn auto_rotate_keeps_distance() {
        let mut camera = OrbitCamera::default();
        assert!(camera.toggle_auto_rotate());
        let distance = camera.distance;
        let yaw = camera.yaw;
        camera.update(1.0);
        assert!((camera.distance - distance).abs() < 1e-5);
        // speed 2.0 → 4π/60 radians per second
        let turned = (yaw - camera.yaw).rem_euclid(TAU);
        assert!((turned - 2.0 * TAU / 60.0).abs() < 1e-4);
    }

    #[test]
    fn reset_restores_home() {
        let mut camera = OrbitCamera::default();
        camera.rotate_by_pixels(50.0, 30.0, 600.0);
        camera.pan_by_pixels(20.0, 10.0, 600.0);
        camera.zoom(4.0);
        for _ in 0..30 {
            camera.update(1.0 / 60.0);
        }
        camera.reset();
        assert!((camera.eye() - HOME_EYE).length() < 1e-4);
        assert_eq!(camera.target, HOME_TARGET);
        assert!(camera.is_settled());
    }

    #[test]
    fn view_projection_puts_target_in_front() {
        let camera = OrbitCamera::default();
        let clip = camera.view_projection(16.0 / 9.0) * HOME_TARGET.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(clip.w > 0.0);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
