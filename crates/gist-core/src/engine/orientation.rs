use nalgebra::{Point3, Vector3};
use std::f64::consts::{PI, TAU};

/// Z-X'-Z'' Euler angles relating a water's body frame to the lab frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    /// Angle between the two z axes, in `[0, π]`.
    pub theta: f64,
    /// Angle from lab x to the line of nodes, in `[0, 2π)`.
    pub phi: f64,
    /// Angle from the line of nodes to body x, in `[0, 2π)`.
    pub psi: f64,
}

/// Why no angles could be computed for a water.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationFailure {
    /// Body and lab z axes are parallel; the line of nodes is undefined.
    GimbalLock,
    /// The O–H vectors are collinear or zero.
    DegenerateGeometry,
}

/// Body frame: x along O→H1, z along (O→H1) × (O→H2), y = z × x.
pub fn water_frame(
    oxygen: &Point3<f64>,
    h1: &Point3<f64>,
    h2: &Point3<f64>,
) -> Option<[Vector3<f64>; 3]> {
    let x = (h1 - oxygen).try_normalize(f64::EPSILON)?;
    let z = x.cross(&(h2 - oxygen)).try_normalize(f64::EPSILON)?;
    let y = z.cross(&x);
    Some([x, y, z])
}

/// Angle of `from` onto `to`, resolved to `[0, 2π)` by the sign of
/// `(from × to) · axis`.
fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let angle = from.dot(to).clamp(-1.0, 1.0).acos();
    if angle > 0.0 && from.cross(to).dot(axis) < 0.0 {
        TAU - angle
    } else {
        angle
    }
}

pub fn euler_angles(
    oxygen: &Point3<f64>,
    h1: &Point3<f64>,
    h2: &Point3<f64>,
) -> Result<EulerAngles, OrientationFailure> {
    let [x_wat, _, z_wat] =
        water_frame(oxygen, h1, h2).ok_or(OrientationFailure::DegenerateGeometry)?;
    let x_lab = Vector3::x();
    let z_lab = Vector3::z();

    let theta = z_lab.dot(&z_wat).clamp(-1.0, 1.0).acos();
    if !(theta > 0.0 && theta < PI) {
        return Err(OrientationFailure::GimbalLock);
    }
    let node = z_lab
        .cross(&z_wat)
        .try_normalize(f64::EPSILON)
        .ok_or(OrientationFailure::GimbalLock)?;

    let phi = signed_angle(&x_lab, &node, &z_lab);
    let psi = signed_angle(&node, &x_wat, &z_wat);
    Ok(EulerAngles { theta, phi, psi })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Unit};

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    /// Body axes for given Euler angles: R = Rz(phi) Rx(theta) Rz(psi).
    fn rotated_water(phi: f64, theta: f64, psi: f64) -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), phi)
            * Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::x()), theta)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), psi);
        let o = Point3::new(1.0, -2.0, 0.5);
        let bend = 104.52f64.to_radians();
        let h1 = o + rotation * Vector3::new(0.9572, 0.0, 0.0);
        let h2 = o + rotation * Vector3::new(0.9572 * bend.cos(), 0.9572 * bend.sin(), 0.0);
        (o, h1, h2)
    }

    #[test]
    fn recovers_constructed_angles() {
        for &(phi, theta, psi) in &[
            (0.3, 1.1, 2.0),
            (4.0, 0.4, 5.5),
            (2.5, 2.9, 0.1),
            (6.0, 1.57, 3.5),
        ] {
            let (o, h1, h2) = rotated_water(phi, theta, psi);
            let angles = euler_angles(&o, &h1, &h2).unwrap();
            assert!(f64_approx_equal(angles.theta, theta), "{angles:?}");
            assert!(f64_approx_equal(angles.phi, phi), "{angles:?}");
            assert!(f64_approx_equal(angles.psi, psi), "{angles:?}");
        }
    }

    #[test]
    fn water_in_lab_xy_plane_is_gimbal_locked() {
        let o = Point3::origin();
        let h1 = Point3::new(0.9572, 0.0, 0.0);
        let h2 = Point3::new(-0.24, 0.927, 0.0);
        assert_eq!(
            euler_angles(&o, &h1, &h2),
            Err(OrientationFailure::GimbalLock)
        );
    }

    #[test]
    fn collinear_hydrogens_are_degenerate() {
        let o = Point3::origin();
        let h1 = Point3::new(1.0, 0.0, 0.0);
        let h2 = Point3::new(-1.0, 0.0, 0.0);
        assert_eq!(
            euler_angles(&o, &h1, &h2),
            Err(OrientationFailure::DegenerateGeometry)
        );
    }

    #[test]
    fn water_frame_is_orthonormal() {
        let (o, h1, h2) = rotated_water(1.0, 0.7, 2.2);
        let [x, y, z] = water_frame(&o, &h1, &h2).unwrap();
        assert!(f64_approx_equal(x.norm(), 1.0));
        assert!(f64_approx_equal(y.norm(), 1.0));
        assert!(f64_approx_equal(z.norm(), 1.0));
        assert!(f64_approx_equal(x.dot(&y), 0.0));
        assert!(f64_approx_equal(x.dot(&z), 0.0));
    }
}
