use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;

pub const DEFAULT_THRESHOLD_DEG: f64 = 1.0;
pub const DEFAULT_STEP: Duration = Duration::seconds(10);
pub const DEFAULT_PRECISION: Duration = Duration::seconds(1);
pub const DEFAULT_HORIZON: Duration = Duration::days(2);
pub const DEFAULT_GUARD: Duration = Duration::seconds(1);
/// Upper bound for every search duration (about a century).
pub const MAX_SPAN: Duration = Duration::days(36_525);

/// Which way elevation has to cross the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Rising,
    Falling,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rising => write!(f, "rising"),
            Direction::Falling => write!(f, "falling"),
        }
    }
}

/// Topocentric look angles, degrees throughout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

impl TrackPoint {
    pub fn new(time: DateTime<Utc>, angles: LookAngles) -> Self {
        Self {
            time,
            azimuth_deg: angles.azimuth_deg,
            elevation_deg: angles.elevation_deg,
            range_km: angles.range_km,
        }
    }
}

/// A predicted satellite pass, AOS to LOS.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PassRecord {
    pub satellite_name: String,
    /// Observer-local calendar date of AOS.
    pub day: NaiveDate,
    pub aos_time: DateTime<Utc>,
    pub los_time: DateTime<Utc>,
    /// Absent for a graze shorter than one search step.
    pub max_elevation_deg: Option<f64>,
    pub max_elevation_time: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub track: Vec<TrackPoint>,
}

/// Instant range searched for AOS times, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SearchWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, PredictError> {
        if start >= end {
            return Err(PredictError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Local midnight of `first_day` up to local midnight after `last_day`.
    pub fn from_local_dates(
        first_day: NaiveDate,
        last_day: NaiveDate,
        tz: FixedOffset,
    ) -> Result<Self, PredictError> {
        let start = local_midnight(first_day, tz)?;
        let end = match last_day.succ_opt() {
            Some(next) => local_midnight(next, tz)?,
            None => return Err(PredictError::InvalidWindow { start, end: start }),
        };
        Self::new(start, end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

fn local_midnight(day: NaiveDate, tz: FixedOffset) -> Result<DateTime<Utc>, PredictError> {
    day.and_time(NaiveTime::MIN)
        .and_local_timezone(tz)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| PredictError::InvalidOptions(format!("no local midnight for {}", day)))
}

/// Tunables for a search. `timezone` decides the calendar day a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub threshold_deg: f64,
    pub step: Duration,
    pub precision: Duration,
    pub horizon: Duration,
    pub guard: Duration,
    pub timezone: FixedOffset,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold_deg: DEFAULT_THRESHOLD_DEG,
            step: DEFAULT_STEP,
            precision: DEFAULT_PRECISION,
            horizon: DEFAULT_HORIZON,
            guard: DEFAULT_GUARD,
            timezone: utc_offset(),
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<(), PredictError> {
        if !(-90.0..90.0).contains(&self.threshold_deg) {
            return Err(PredictError::InvalidOptions(format!(
                "threshold {} deg outside [-90, 90)",
                self.threshold_deg
            )));
        }
        for (name, value) in [
            ("step", self.step),
            ("precision", self.precision),
            ("horizon", self.horizon),
            ("guard", self.guard),
        ] {
            if value <= Duration::zero() {
                return Err(PredictError::InvalidOptions(format!(
                    "{} must be positive",
                    name
                )));
            }
            if value > MAX_SPAN {
                return Err(PredictError::InvalidOptions(format!(
                    "{} exceeds {} days",
                    name,
                    MAX_SPAN.num_days()
                )));
            }
        }
        Ok(())
    }

    /// Observer-local calendar date of `at`.
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// `at + by`, failing instead of overflowing the representable range.
pub(crate) fn advance(at: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>, PredictError> {
    at.checked_add_signed(by).ok_or_else(|| {
        PredictError::InvalidOptions(format!(
            "{} s from {} is out of range",
            by.num_seconds(),
            at
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let t = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        assert!(matches!(
            SearchWindow::new(t, t),
            Err(PredictError::InvalidWindow { .. })
        ));
        assert!(SearchWindow::new(t, t + Duration::seconds(1)).is_ok());
    }

    #[test]
    fn test_window_from_local_dates_is_inclusive_of_last_day() {
        let day = NaiveDate::from_ymd_opt(2024, 11, 20).unwrap();
        let window = SearchWindow::from_local_dates(day, day, jst()).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 11, 19, 15, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 11, 20, 15, 0, 0).unwrap());
        assert_eq!(window.duration(), Duration::days(1));
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_window_from_local_dates_rejects_reversed_days() {
        let first = NaiveDate::from_ymd_opt(2024, 11, 21).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 11, 19).unwrap();
        assert!(SearchWindow::from_local_dates(first, last, jst()).is_err());
    }

    #[test]
    fn test_options_validation() {
        assert!(SearchOptions::default().validate().is_ok());

        let bad_step = SearchOptions {
            step: Duration::zero(),
            ..Default::default()
        };
        assert!(matches!(
            bad_step.validate(),
            Err(PredictError::InvalidOptions(_))
        ));

        let bad_threshold = SearchOptions {
            threshold_deg: 95.0,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());

        let huge_horizon = SearchOptions {
            horizon: Duration::days(365 * 300_000),
            ..Default::default()
        };
        assert!(matches!(
            huge_horizon.validate(),
            Err(PredictError::InvalidOptions(_))
        ));

        let huge_step = SearchOptions {
            step: MAX_SPAN + Duration::seconds(1),
            ..Default::default()
        };
        assert!(huge_step.validate().is_err());
    }

    #[test]
    fn test_advance_reports_overflow() {
        let t = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        assert_eq!(advance(t, Duration::hours(1)).unwrap(), t + Duration::hours(1));
        assert!(matches!(
            advance(DateTime::<Utc>::MAX_UTC, Duration::seconds(1)),
            Err(PredictError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_local_day_uses_observer_offset() {
        let options = SearchOptions {
            timezone: jst(),
            ..Default::default()
        };
        // 16:30 UTC is already the next day in JST
        let at = Utc.with_ymd_and_hms(2024, 11, 20, 16, 30, 0).unwrap();
        assert_eq!(
            options.local_day(at),
            NaiveDate::from_ymd_opt(2024, 11, 21).unwrap()
        );
    }
}
