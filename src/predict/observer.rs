use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;

/// Fixed ground location a search is run for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Observer {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<Self, PredictError> {
        if !latitude_deg.is_finite() || !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(PredictError::InvalidObserver(format!(
                "latitude {} outside [-90, 90]",
                latitude_deg
            )));
        }
        if !longitude_deg.is_finite() || !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(PredictError::InvalidObserver(format!(
                "longitude {} outside [-180, 180]",
                longitude_deg
            )));
        }
        if !altitude_m.is_finite() {
            return Err(PredictError::InvalidObserver("altitude is not finite".into()));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        })
    }

    /// Parses `"lat, lon"` as written in the station config.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Result<Self, PredictError> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(PredictError::InvalidObserver(format!(
                "expected 'lat, lon', got '{}'",
                coordinates
            )));
        }
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| PredictError::InvalidObserver(format!("'{}': {}", s, e)))
        };
        Self::new(parse(parts[0])?, parse(parts[1])?, altitude_m.unwrap_or(0.0))
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - e2) + alt_km) * sin_lat,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coordinates() {
        let obs = Observer::from_coordinates("35.9864, 139.3739", Some(12.0)).unwrap();
        assert_eq!(obs.latitude_deg, 35.9864);
        assert_eq!(obs.longitude_deg, 139.3739);
        assert_eq!(obs.altitude_m, 12.0);

        let obs = Observer::from_coordinates("-33.9,18.4", None).unwrap();
        assert_eq!(obs.altitude_m, 0.0);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            Observer::new(91.0, 0.0, 0.0),
            Err(PredictError::InvalidObserver(_))
        ));
        assert!(Observer::new(0.0, -180.5, 0.0).is_err());
        assert!(Observer::new(f64::NAN, 0.0, 0.0).is_err());
        assert!(Observer::from_coordinates("35.9", None).is_err());
        assert!(Observer::from_coordinates("north, 139.3", None).is_err());
    }

    #[test]
    fn test_ecef_equator_and_pole() {
        let equator = Observer::new(0.0, 0.0, 0.0).unwrap().position_ecef_km();
        assert!((equator[0] - 6378.137).abs() < 1e-6);
        assert!(equator[1].abs() < 1e-6 && equator[2].abs() < 1e-6);

        let pole = Observer::new(90.0, 0.0, 0.0).unwrap().position_ecef_km();
        // WGS-84 polar radius
        assert!((pole[2] - 6356.752).abs() < 1e-3);
    }
}
