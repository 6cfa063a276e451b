use chrono::{DateTime, Duration, Utc};

use crate::abort::AbortHandle;
use crate::predict::error::PredictError;
use crate::predict::geometry::Geometry;
use crate::predict::observer::Observer;
use crate::predict::types::{advance, Direction, SearchOptions, TrackPoint};

/// Everything a search samples against. Borrowed for the duration of one
/// search; holds no state of its own.
pub struct SearchContext<'a, G: ?Sized> {
    pub geometry: &'a G,
    pub observer: &'a Observer,
    pub options: &'a SearchOptions,
    pub abort: &'a AbortHandle,
}

impl<'a, G: Geometry + ?Sized> SearchContext<'a, G> {
    pub fn new(
        geometry: &'a G,
        observer: &'a Observer,
        options: &'a SearchOptions,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            geometry,
            observer,
            options,
            abort,
        }
    }

    pub fn sample(&self, at: DateTime<Utc>) -> Result<TrackPoint, PredictError> {
        let angles = self.geometry.look_angles(self.observer, at)?;
        Ok(TrackPoint::new(at, angles))
    }

    /// Visible means strictly above the threshold.
    pub fn is_above(&self, point: &TrackPoint) -> bool {
        point.elevation_deg > self.options.threshold_deg
    }

    /// Steps forward from `from` until elevation crosses the threshold in
    /// `direction`, then bisects the bracketing step down to
    /// `options.precision`. Gives up with `NoCrossingFound` once `horizon`
    /// has been scanned.
    pub fn find_crossing(
        &self,
        from: DateTime<Utc>,
        direction: Direction,
        horizon: Duration,
    ) -> Result<TrackPoint, PredictError> {
        let limit = advance(from, horizon)?;
        let mut prev = self.sample(from)?;
        let mut prev_above = self.is_above(&prev);

        loop {
            self.abort.check(prev.time)?;
            if prev.time >= limit {
                return Err(PredictError::NoCrossingFound {
                    direction,
                    from,
                    horizon,
                });
            }

            let next = self.sample(advance(prev.time, self.options.step)?.min(limit))?;
            let above = self.is_above(&next);
            if crosses(direction, prev_above, above) {
                return self.refine(prev.time, next, direction);
            }
            prev = next;
            prev_above = above;
        }
    }

    /// Bisects between `before` (pre-crossing side) and `after`
    /// (post-crossing side). Returns the earliest sampled instant on the
    /// post-crossing side.
    pub fn refine(
        &self,
        before: DateTime<Utc>,
        after: TrackPoint,
        direction: Direction,
    ) -> Result<TrackPoint, PredictError> {
        let mut low = before;
        let mut high = after;

        while high.time - low > self.options.precision {
            let mid = self.sample(low + (high.time - low) / 2)?;
            let past_crossing = match direction {
                Direction::Rising => self.is_above(&mid),
                Direction::Falling => !self.is_above(&mid),
            };
            if past_crossing {
                high = mid;
            } else {
                low = mid.time;
            }
        }

        Ok(high)
    }
}

fn crosses(direction: Direction, was_above: bool, is_above: bool) -> bool {
    match direction {
        Direction::Rising => !was_above && is_above,
        Direction::Falling => was_above && !is_above,
    }
}

/// Next instant after `from` at which elevation crosses
/// `options.threshold_deg` in `direction`, searching at most
/// `options.horizon` ahead.
pub fn find_crossing<G: Geometry + ?Sized>(
    observer: &Observer,
    geometry: &G,
    from: DateTime<Utc>,
    direction: Direction,
    options: &SearchOptions,
    abort: &AbortHandle,
) -> Result<DateTime<Utc>, PredictError> {
    options.validate()?;
    SearchContext::new(geometry, observer, options, abort)
        .find_crossing(from, direction, options.horizon)
        .map(|point| point.time)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::predict::types::LookAngles;
    use chrono::TimeZone;

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap()
    }

    pub fn seconds_since(t: DateTime<Utc>, origin: DateTime<Utc>) -> f64 {
        (t - origin).num_milliseconds() as f64 / 1000.0
    }

    pub fn angles(elevation_deg: f64) -> LookAngles {
        LookAngles {
            azimuth_deg: 0.0,
            elevation_deg,
            range_km: 1000.0,
        }
    }

    fn observer() -> Observer {
        Observer::new(35.9864, 139.3739, 0.0).unwrap()
    }

    #[test]
    fn test_rising_crossing_is_refined_below_step() {
        // 1 deg reached exactly 60 s after t0
        let ramp = |_: &Observer, t: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(seconds_since(t, t0()) / 10.0 - 5.0))
        };
        let options = SearchOptions::default();
        let aos = find_crossing(
            &observer(),
            &ramp,
            t0(),
            Direction::Rising,
            &options,
            &AbortHandle::new(),
        )
        .unwrap();

        let offset = seconds_since(aos, t0());
        assert!(offset > 60.0 && offset <= 61.0, "offset {offset}");
    }

    #[test]
    fn test_falling_crossing_reports_first_instant_at_or_below() {
        let ramp = |_: &Observer, t: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(5.0 - seconds_since(t, t0()) / 10.0))
        };
        let options = SearchOptions::default();
        let observer = observer();
        let abort = AbortHandle::new();
        let ctx = SearchContext::new(&ramp, &observer, &options, &abort);
        let los = ctx
            .find_crossing(t0(), Direction::Falling, options.horizon)
            .unwrap();

        let offset = seconds_since(los.time, t0());
        assert!((39.0..=41.0).contains(&offset), "offset {offset}");
        assert!(!ctx.is_above(&los));
    }

    #[test]
    fn test_rising_search_skips_pass_in_progress() {
        // Above threshold for the first 100 s, below until 300 s, above again after
        let wave = |_: &Observer, t: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            let s = seconds_since(t, t0());
            Ok(angles(if s < 100.0 || s >= 300.0 { 10.0 } else { -10.0 }))
        };
        let aos = find_crossing(
            &observer(),
            &wave,
            t0(),
            Direction::Rising,
            &SearchOptions::default(),
            &AbortHandle::new(),
        )
        .unwrap();
        let offset = seconds_since(aos, t0());
        assert!((300.0..=301.0).contains(&offset), "offset {offset}");
    }

    #[test]
    fn test_horizon_exhausted() {
        let never = |_: &Observer, _: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(-20.0))
        };
        let options = SearchOptions {
            horizon: Duration::hours(3),
            ..Default::default()
        };
        let err = find_crossing(
            &observer(),
            &never,
            t0(),
            Direction::Rising,
            &options,
            &AbortHandle::new(),
        )
        .unwrap_err();
        match err {
            PredictError::NoCrossingFound {
                direction,
                from,
                horizon,
            } => {
                assert_eq!(direction, Direction::Rising);
                assert_eq!(from, t0());
                assert_eq!(horizon, Duration::hours(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_object_parked_at_threshold_terminates() {
        let parked = |_: &Observer, _: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(1.0))
        };
        let options = SearchOptions {
            horizon: Duration::minutes(30),
            ..Default::default()
        };
        let result = find_crossing(
            &observer(),
            &parked,
            t0(),
            Direction::Rising,
            &options,
            &AbortHandle::new(),
        );
        assert!(matches!(result, Err(PredictError::NoCrossingFound { .. })));
    }

    #[test]
    fn test_aborted_search_is_cancelled() {
        let never = |_: &Observer, _: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(-20.0))
        };
        let abort = AbortHandle::new();
        abort.abort();
        let result = find_crossing(
            &observer(),
            &never,
            t0(),
            Direction::Rising,
            &SearchOptions::default(),
            &abort,
        );
        assert!(matches!(result, Err(PredictError::Cancelled { .. })));
    }

    #[test]
    fn test_propagation_error_is_passed_through() {
        let failing = |_: &Observer, t: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Err(PredictError::Propagation {
                satellite: "DECAYED".into(),
                at: t,
                message: "negative semi-latus rectum".into(),
            })
        };
        let result = find_crossing(
            &observer(),
            &failing,
            t0(),
            Direction::Rising,
            &SearchOptions::default(),
            &AbortHandle::new(),
        );
        match result {
            Err(PredictError::Propagation { satellite, at, .. }) => {
                assert_eq!(satellite, "DECAYED");
                assert_eq!(at, t0());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_horizon_past_representable_range_is_an_error() {
        let never = |_: &Observer, _: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(-20.0))
        };
        let options = SearchOptions::default();
        let observer = observer();
        let abort = AbortHandle::new();
        let ctx = SearchContext::new(&never, &observer, &options, &abort);
        let result = ctx.find_crossing(t0(), Direction::Rising, Duration::days(365 * 300_000));
        assert!(matches!(result, Err(PredictError::InvalidOptions(_))));

        let huge = SearchOptions {
            horizon: Duration::days(365 * 300_000),
            ..Default::default()
        };
        let result = find_crossing(&observer, &never, t0(), Direction::Rising, &huge, &abort);
        assert!(matches!(result, Err(PredictError::InvalidOptions(_))));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let never = |_: &Observer, _: DateTime<Utc>| -> Result<LookAngles, PredictError> {
            Ok(angles(-20.0))
        };
        let options = SearchOptions {
            step: Duration::seconds(-10),
            ..Default::default()
        };
        let result = find_crossing(
            &observer(),
            &never,
            t0(),
            Direction::Rising,
            &options,
            &AbortHandle::new(),
        );
        assert!(matches!(result, Err(PredictError::InvalidOptions(_))));
    }
}
