use std::f32::consts::{FRAC_PI_4, PI};

use crate::math::{Matrix, Vector};

const NEAR: f32 = 0.01;
const FAR: f32 = 10000.0;

/// Perspective camera oriented by azimuth and elevation.
///
/// Direction vectors and matrices are recomputed on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vector,
    /// Rotation around +Y in radians, zero looking down +X.
    pub azimuth: f32,
    /// Angle above the horizontal plane in radians.
    pub elevation: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Viewport height divided by width.
    pub aspect: f32,
    pub fog_density: f32,
    pub fog_color: Vector,
    pub background: Vector,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector::new(3.0, 3.0, 3.0),
            azimuth: 3.0 * PI / 4.0,
            elevation: -FRAC_PI_4,
            fov: FRAC_PI_4,
            aspect: 1.0,
            fog_density: 0.0,
            fog_color: Vector::ONE,
            background: Vector::ONE,
        }
    }
}

impl Camera {
    pub fn direction(&self) -> Vector {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        Vector::new(cos_az * cos_el, sin_el, -sin_az * cos_el).normalize()
    }

    pub fn right(&self) -> Vector {
        Vector::Y.cross(-self.direction()).normalize()
    }

    pub fn up(&self) -> Vector {
        (-self.direction()).cross(self.right()).normalize()
    }

    /// Points the camera at `target`. Does nothing when `target` is the
    /// camera position.
    pub fn look_at(&mut self, target: Vector) {
        let offset = target - self.position;
        if offset.length_squared() == 0.0 {
            return;
        }
        let d = offset.normalize();
        self.azimuth = (-d.z).atan2(d.x);
        self.elevation = d.y.clamp(-1.0, 1.0).asin();
    }

    /// World to camera transform.
    pub fn view_matrix(&self) -> Matrix {
        let r = self.right();
        let u = self.up();
        let v = -self.direction();
        let c = self.position;
        let rows = [
            r.x, r.y, r.z, -c.dot(r), //
            u.x, u.y, u.z, -c.dot(u), //
            v.x, v.y, v.z, -c.dot(v), //
            0.0, 0.0, 0.0, 1.0,
        ];
        Matrix::from_rows(rows)
    }

    pub fn projection_matrix(&self) -> Matrix {
        let e = 1.0 / (self.fov / 2.0).tan();
        let a = self.aspect;
        let (n, f) = (NEAR, FAR);
        let rows = [
            e, 0.0, 0.0, 0.0, //
            0.0, e / a, 0.0, 0.0, //
            0.0, 0.0, -(f + n) / (f - n), -2.0 * f * n / (f - n), //
            0.0, 0.0, -1.0, 0.0,
        ];
        Matrix::from_rows(rows)
    }
}
