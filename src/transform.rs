//! Conversion between the host's 3x4 device transforms and position + quaternion.
//!
//! Pure functions, no host calls.

use crate::types::{HmdMatrix34, Quaternion};

/// Translation column of a device transform.
pub fn position(m: &HmdMatrix34) -> [f64; 3] {
    [m[0][3] as f64, m[1][3] as f64, m[2][3] as f64]
}

/// Rotation block of a device transform as a unit quaternion.
///
/// Uses the trace when it is positive, otherwise the branch of the largest
/// diagonal term so the divisor never approaches zero. Comparisons are strict:
/// x wins only if `m00` is strictly greatest, then y if `m11 > m22`, else z.
///
/// Returns `None` when the input is not finite or does not yield a usable
/// quaternion (e.g. a degenerate non-rotation matrix).
#[allow(clippy::many_single_char_names)]
pub fn rotation(m: &HmdMatrix34) -> Option<Quaternion> {
    let r = |row: usize, col: usize| m[row][col] as f64;
    let (m00, m01, m02) = (r(0, 0), r(0, 1), r(0, 2));
    let (m10, m11, m12) = (r(1, 0), r(1, 1), r(1, 2));
    let (m20, m21, m22) = (r(2, 0), r(2, 1), r(2, 2));

    let trace = m00 + m11 + m22;
    let q = if trace > 0.0 {
        let s = 0.5 / (trace + 1.0).sqrt();
        Quaternion::new(0.25 / s, (m21 - m12) * s, (m02 - m20) * s, (m10 - m01) * s)
    } else if m00 > m11 && m00 > m22 {
        let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
        Quaternion::new((m21 - m12) / s, 0.25 * s, (m01 + m10) / s, (m02 + m20) / s)
    } else if m11 > m22 {
        let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
        Quaternion::new((m02 - m20) / s, (m01 + m10) / s, 0.25 * s, (m12 + m21) / s)
    } else {
        let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
        Quaternion::new((m10 - m01) / s, (m02 + m20) / s, (m12 + m21) / s, 0.25 * s)
    };

    normalize(q)
}

/// Splits a device transform into position and rotation.
///
/// `None` if any component of the transform is NaN or infinite, or the
/// rotation block cannot be converted.
pub fn decompose(m: &HmdMatrix34) -> Option<([f64; 3], Quaternion)> {
    if !m.iter().flatten().all(|v| v.is_finite()) {
        return None;
    }
    let q = rotation(m)?;
    Some((position(m), q))
}

/// Builds a device transform from a rotation and a translation.
pub fn matrix_from_quaternion(q: &Quaternion, position: [f64; 3]) -> HmdMatrix34 {
    let Quaternion { w, x, y, z } = *q;
    let rows = [
        [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w)],
        [2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w)],
        [2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y)],
    ];
    let mut m = [[0.0f32; 4]; 3];
    for (row, out) in rows.iter().zip(m.iter_mut()) {
        out[0] = row[0] as f32;
        out[1] = row[1] as f32;
        out[2] = row[2] as f32;
    }
    for (i, p) in position.iter().enumerate() {
        m[i][3] = *p as f32;
    }
    m
}

/// Quaternion rotating by `angle` radians about `axis` (need not be normalized).
pub fn axis_angle(axis: [f64; 3], angle: f64) -> Quaternion {
    let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if len == 0.0 || !len.is_finite() {
        return Quaternion::IDENTITY;
    }
    let (s, c) = (angle * 0.5).sin_cos();
    Quaternion::new(c, axis[0] / len * s, axis[1] / len * s, axis[2] / len * s)
}

fn normalize(q: Quaternion) -> Option<Quaternion> {
    let n = q.norm();
    if !n.is_finite() || n < 1e-12 {
        return None;
    }
    let out = Quaternion::new(q.w / n, q.x / n, q.y / n, q.z / n);
    out.is_finite().then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IDENTITY_MATRIX34;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-5;

    fn assert_same_rotation(a: &Quaternion, b: &Quaternion) {
        assert!(a.is_finite() && b.is_finite());
        assert!((a.norm() - 1.0).abs() < EPS, "not unit: {:?}", a);
        // q and -q are the same rotation
        assert!(
            (a.dot(b).abs() - 1.0).abs() < EPS,
            "rotations differ: {:?} vs {:?}",
            a,
            b
        );
    }

    fn round_trip(q: Quaternion) {
        let m = matrix_from_quaternion(&q, [0.0; 3]);
        let back = rotation(&m).expect("valid rotation must convert");
        assert_same_rotation(&back, &q);
    }

    #[test]
    fn test_matrix_layout() {
        let matrix = [[0., 1., 2., 3.], [4., 5., 6., 7.], [8., 9., 10., 11.]];
        assert_eq!(position(&matrix), [3.0, 7.0, 11.0]);
    }

    #[test]
    fn test_identity() {
        let (pos, q) = decompose(&IDENTITY_MATRIX34).unwrap();
        assert_eq!(pos, [0.0; 3]);
        assert_same_rotation(&q, &Quaternion::IDENTITY);
    }

    #[test]
    fn test_half_turn_about_each_axis() {
        // trace == -1 for every half turn, so the trace branch is never taken
        let x = [[1., 0., 0., 0.], [0., -1., 0., 0.], [0., 0., -1., 0.]];
        let y = [[-1., 0., 0., 0.], [0., 1., 0., 0.], [0., 0., -1., 0.]];
        let z = [[-1., 0., 0., 0.], [0., -1., 0., 0.], [0., 0., 1., 0.]];
        assert_same_rotation(&rotation(&x).unwrap(), &Quaternion::new(0., 1., 0., 0.));
        assert_same_rotation(&rotation(&y).unwrap(), &Quaternion::new(0., 0., 1., 0.));
        assert_same_rotation(&rotation(&z).unwrap(), &Quaternion::new(0., 0., 0., 1.));
    }

    #[test]
    fn test_near_half_turns_stay_finite() {
        let axes = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [-0.3, 0.8, 0.52],
        ];
        for axis in axes {
            for angle in [PI - 1e-3, PI - 1e-6, PI, PI + 1e-6, -PI + 1e-4] {
                round_trip(axis_angle(axis, angle));
            }
        }
    }

    #[test]
    fn test_round_trip_general_rotations() {
        let axes = [[1.0, 2.0, 3.0], [-1.0, 0.5, 0.0], [0.0, 0.0, -1.0]];
        for axis in axes {
            for step in 0..12 {
                round_trip(axis_angle(axis, step as f64 * PI / 6.0));
            }
        }
    }

    #[test]
    fn test_diagonal_tie_uses_later_axis() {
        // half turn about (1,1,0): m00 == m11 == 0, m22 == -1
        let q = axis_angle([1.0, 1.0, 0.0], PI);
        let m = matrix_from_quaternion(&q, [0.0; 3]);
        assert_eq!(m[0][0], m[1][1]);
        assert_same_rotation(&rotation(&m).unwrap(), &q);
    }

    #[test]
    fn test_translation_survives_round_trip() {
        let q = axis_angle([0.0, 1.0, 0.0], 0.7);
        let m = matrix_from_quaternion(&q, [0.25, 1.5, -2.0]);
        let (pos, back) = decompose(&m).unwrap();
        assert!((pos[0] - 0.25).abs() < EPS);
        assert!((pos[1] - 1.5).abs() < EPS);
        assert!((pos[2] + 2.0).abs() < EPS);
        assert_same_rotation(&back, &q);
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let mut m = IDENTITY_MATRIX34;
        m[1][2] = f32::NAN;
        assert!(decompose(&m).is_none());
        let mut m = IDENTITY_MATRIX34;
        m[0][3] = f32::INFINITY;
        assert!(decompose(&m).is_none());
    }

    #[test]
    fn test_degenerate_matrix_stays_finite() {
        let zero = [[0.0f32; 4]; 3];
        let inverted = [[-1., 0., 0., 0.], [0., -1., 0., 0.], [0., 0., -1., 0.]];
        for m in [zero, inverted] {
            let q = rotation(&m).unwrap();
            assert!(q.is_finite());
            assert!((q.norm() - 1.0).abs() < EPS);
        }
    }
}
