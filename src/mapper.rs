use nalgebra as na;
use tracing::{debug, warn};

use crate::error::Error;

/// Relative rank tolerance on the R diagonal of the DLT system.
const RANK_EPS: f64 = 1e-9;

/// Planar projective mapping between image-plane pixels and ground-plane
/// coordinates. Models a single flat ground plane: object height and road
/// elevation are deliberately not accounted for.
#[derive(Debug, Clone, Default)]
pub struct CoordinateMapper {
    transform: Option<Homography>,
}

#[derive(Debug, Clone)]
struct Homography {
    forward: na::Matrix3<f64>,
    inverse: na::Matrix3<f64>,
}

impl CoordinateMapper {
    pub fn new() -> Self {
        Self { transform: None }
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.transform.is_some()
    }

    /// Solves the forward and inverse homography from point correspondences.
    /// Needs at least 4 pairs of equal length. Returns `false` and leaves the
    /// mapper uncalibrated on malformed or degenerate (e.g. collinear) input.
    /// A successful call fully replaces any prior calibration.
    pub fn calibrate(
        &mut self,
        image_points: &[na::Point2<f32>],
        world_points: &[na::Point2<f32>],
    ) -> bool {
        self.transform = None;

        if image_points.len() != world_points.len() || image_points.len() < 4 {
            warn!(
                image_points = image_points.len(),
                world_points = world_points.len(),
                "calibration needs at least 4 corresponding point pairs"
            );
            return false;
        }

        let forward = solve_homography(image_points, world_points);
        let inverse = solve_homography(world_points, image_points);

        match (forward, inverse) {
            (Some(forward), Some(inverse)) => {
                self.transform = Some(Homography { forward, inverse });
                debug!(pairs = image_points.len(), "coordinate mapper calibrated");
                true
            }
            _ => {
                warn!("degenerate correspondence set, no finite homography exists");
                false
            }
        }
    }

    /// Maps image-plane points onto the ground plane.
    pub fn image_to_world(
        &self,
        points: &[na::Point2<f32>],
    ) -> Result<Vec<na::Point2<f32>>, Error> {
        let t = self.transform.as_ref().ok_or(Error::NotCalibrated)?;

        Ok(points.iter().map(|p| apply(&t.forward, p)).collect())
    }

    /// Maps ground-plane points back into the image plane.
    pub fn world_to_image(
        &self,
        points: &[na::Point2<f32>],
    ) -> Result<Vec<na::Point2<f32>>, Error> {
        let t = self.transform.as_ref().ok_or(Error::NotCalibrated)?;

        Ok(points.iter().map(|p| apply(&t.inverse, p)).collect())
    }
}

#[inline]
fn apply(m: &na::Matrix3<f64>, p: &na::Point2<f32>) -> na::Point2<f32> {
    let v = m * na::Vector3::new(p.x as f64, p.y as f64, 1.0);

    na::Point2::new((v.x / v.z) as f32, (v.y / v.z) as f32)
}

/// Direct linear solve for the homography mapping `src` to `dst`, with the
/// bottom-right element pinned to 1. Least squares over 4 or more pairs via
/// QR, `None` when the system is rank deficient.
fn solve_homography(
    src: &[na::Point2<f32>],
    dst: &[na::Point2<f32>],
) -> Option<na::Matrix3<f64>> {
    let n = src.len();
    let mut a = na::DMatrix::<f64>::zeros(2 * n, 8);
    let mut b = na::DVector::<f64>::zeros(2 * n);

    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = (s.x as f64, s.y as f64);
        let (u, v) = (d.x as f64, d.y as f64);
        let r = 2 * i;

        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let qr = a.qr();
    let r = qr.r();

    let max_diag = (0..8).map(|i| r[(i, i)].abs()).fold(0.0f64, f64::max);
    if max_diag == 0.0 || (0..8).any(|i| r[(i, i)].abs() < RANK_EPS * max_diag) {
        return None;
    }

    let qty = qr.q().transpose() * b;
    let h = r.solve_upper_triangular(&qty)?;

    if h.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(na::Matrix3::new(
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    ))
}
