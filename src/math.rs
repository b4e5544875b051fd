use nalgebra as na;

use crate::Float;

/// Least-squares fit of the plane `y = a*x + b*z + c` through `points`.
///
/// Builds the 3x3 normal equations from the sums of `x, z, y, x², z², xz, xy, zy`
/// and returns `(a, b, c)`, or `None` when the system is singular
/// (`|det| < eps`) or there are fewer than three points.
pub fn plane_ls<'a, T, I>(points: I, eps: T) -> Option<na::Vector3<T>>
where
    T: Float,
    I: IntoIterator<Item = &'a na::Point3<T>>,
{
    let mut n = 0usize;
    let (mut s_x, mut s_z, mut s_y) = (T::zero(), T::zero(), T::zero());
    let (mut s_xx, mut s_zz, mut s_xz) = (T::zero(), T::zero(), T::zero());
    let (mut s_xy, mut s_zy) = (T::zero(), T::zero());

    for p in points {
        let (x, y, z) = (p.x, p.y, p.z);

        s_x += x;
        s_z += z;
        s_y += y;
        s_xx += x * x;
        s_zz += z * z;
        s_xz += x * z;
        s_xy += x * y;
        s_zy += z * y;
        n += 1;
    }

    if n < 3 {
        return None;
    }

    let n = T::from_usize(n)?;
    let a = na::Matrix3::new(s_xx, s_xz, s_x, s_xz, s_zz, s_z, s_x, s_z, n);
    let b = na::Vector3::new(s_xy, s_zy, s_y);

    let det = a.determinant();
    if det < eps && det > -eps {
        return None;
    }

    a.try_inverse().map(|inv| inv * b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid<F: Fn(f64, f64) -> f64>(f: F) -> Vec<na::Point3<f64>> {
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let x = i as f64 * 0.1;
                let z = j as f64 * 0.1;
                pts.push(na::Point3::new(x, f(x, z), z));
            }
        }
        pts
    }

    #[test]
    fn recovers_inclined_plane() {
        let pts = grid(|x, z| 0.2 * x - 0.1 * z + 1.5);
        let params = plane_ls(&pts, 1e-9).unwrap();

        assert_relative_eq!(params[0], 0.2, epsilon = 1e-8);
        assert_relative_eq!(params[1], -0.1, epsilon = 1e-8);
        assert_relative_eq!(params[2], 1.5, epsilon = 1e-8);
    }

    #[test]
    fn collinear_points_are_singular() {
        let pts: Vec<_> = (0..10)
            .map(|i| na::Point3::new(i as f64, 0.5, 0.0))
            .collect();

        assert!(plane_ls(&pts, 1e-9).is_none());
    }

    #[test]
    fn too_few_points() {
        let pts = vec![na::Point3::new(0.0f32, 0.0, 0.0), na::Point3::new(1.0, 0.0, 1.0)];
        assert!(plane_ls(&pts, 1e-6).is_none());
    }
}
