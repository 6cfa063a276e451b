use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::PassRecord;

/// Sky-plot coordinate: zenith at the centre, horizon on the rim, north up,
/// azimuth increasing clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PolarPoint {
    pub theta_deg: f64,
    pub radius_deg: f64,
}

impl PolarPoint {
    pub fn from_angles(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            theta_deg: azimuth_deg.rem_euclid(360.0),
            radius_deg: (90.0 - elevation_deg).max(0.0),
        }
    }

    /// Cartesian position on a plot of radius 90, x east and y north.
    pub fn to_xy(&self) -> (f64, f64) {
        let theta = self.theta_deg.to_radians();
        (self.radius_deg * theta.sin(), self.radius_deg * theta.cos())
    }
}

pub fn polar_track(record: &PassRecord) -> Vec<PolarPoint> {
    record
        .track
        .iter()
        .map(|p| PolarPoint::from_angles(p.azimuth_deg, p.elevation_deg))
        .collect()
}
