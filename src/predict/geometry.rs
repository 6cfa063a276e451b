use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::predict::element_set::ElementSet;
use crate::predict::error::PredictError;
use crate::predict::observer::Observer;
use crate::predict::types::LookAngles;

/// Point-in-time look angles for an observer. Must be a pure function of
/// its inputs: the search samples it repeatedly and out of order.
pub trait Geometry {
    fn look_angles(&self, observer: &Observer, at: DateTime<Utc>) -> Result<LookAngles, PredictError>;
}

impl<F> Geometry for F
where
    F: Fn(&Observer, DateTime<Utc>) -> Result<LookAngles, PredictError>,
{
    fn look_angles(&self, observer: &Observer, at: DateTime<Utc>) -> Result<LookAngles, PredictError> {
        self(observer, at)
    }
}

/// SGP4/SDP4 propagation of a two-line element set. Accuracy degrades
/// with distance from the element epoch; staleness is the caller's concern.
pub struct Sgp4Geometry {
    name: String,
    elements: Elements,
    constants: Constants,
}

impl Sgp4Geometry {
    pub fn new(set: &ElementSet) -> Result<Self, PredictError> {
        let elements = Elements::from_tle(
            Some(set.name.clone()),
            set.line1.as_bytes(),
            set.line2.as_bytes(),
        )
        .map_err(|e| PredictError::malformed(&set.name, e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PredictError::malformed(&set.name, e.to_string()))?;

        Ok(Self {
            name: set.name.clone(),
            elements,
            constants,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }

    fn propagation_error(&self, at: DateTime<Utc>, message: String) -> PredictError {
        PredictError::Propagation {
            satellite: self.name.clone(),
            at,
            message,
        }
    }
}

impl Geometry for Sgp4Geometry {
    fn look_angles(&self, observer: &Observer, at: DateTime<Utc>) -> Result<LookAngles, PredictError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| self.propagation_error(at, e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| self.propagation_error(at, e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&at.naive_utc()));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sta_ecef = observer.position_ecef_km();
        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];

        Ok(look_angles_from_ecef_delta(dr, observer))
    }
}

/// Azimuth (north = 0, clockwise), elevation and range for an
/// observer-to-object ECEF difference vector in km.
pub fn look_angles_from_ecef_delta(dr: [f64; 3], observer: &Observer) -> LookAngles {
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        0.0
    };

    LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
