use std::collections::BTreeMap;
use std::iter::FusedIterator;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::abort::AbortHandle;
use crate::predict::crossing::SearchContext;
use crate::predict::error::PredictError;
use crate::predict::geometry::Geometry;
use crate::predict::observer::Observer;
use crate::predict::types::{
    advance, Direction, PassRecord, SearchOptions, SearchWindow, TrackPoint,
};

impl<'a, G: Geometry + ?Sized> SearchContext<'a, G> {
    /// Finds the next AOS within `aos_horizon` of `search_start`, then walks
    /// the pass at `step` cadence until it sets. Returns the record and the
    /// instant the next search should resume from.
    pub fn extract_pass(
        &self,
        satellite_name: &str,
        search_start: DateTime<Utc>,
        aos_horizon: Duration,
    ) -> Result<(PassRecord, DateTime<Utc>), PredictError> {
        let aos = self.find_crossing(search_start, Direction::Rising, aos_horizon)?;

        let mut track = vec![aos.clone()];
        let mut best: Option<TrackPoint> = None;
        let mut prev_time = aos.time;

        let los = loop {
            self.abort.check(prev_time)?;
            let time = advance(prev_time, self.options.step)?;
            if time - aos.time > self.options.horizon {
                return Err(PredictError::NoCrossingFound {
                    direction: Direction::Falling,
                    from: aos.time,
                    horizon: self.options.horizon,
                });
            }

            let point = self.sample(time)?;
            if !self.is_above(&point) {
                break self.refine(prev_time, point, Direction::Falling)?;
            }
            if best
                .as_ref()
                .map_or(true, |b| point.elevation_deg > b.elevation_deg)
            {
                best = Some(point.clone());
            }
            track.push(point);
            prev_time = time;
        };

        let peak = match best {
            Some(best) => Some(self.refine_maximum(best, aos.time, los.time)?),
            None => None,
        };

        track.push(los.clone());
        let record = PassRecord {
            satellite_name: satellite_name.to_string(),
            day: self.options.local_day(aos.time),
            aos_time: aos.time,
            los_time: los.time,
            max_elevation_deg: peak.as_ref().map(|p| p.elevation_deg.min(90.0)),
            max_elevation_time: peak.as_ref().map(|p| p.time),
            duration_seconds: (los.time - aos.time).num_milliseconds() as f64 / 1000.0,
            track,
        };

        log::debug!(
            "{}: pass {} -> {} ({:.0} s)",
            satellite_name,
            record.aos_time,
            record.los_time,
            record.duration_seconds
        );

        let resume_at = advance(los.time, self.options.guard)?;
        Ok((record, resume_at))
    }

    /// Ternary search around the best coarse sample, kept inside the pass.
    fn refine_maximum(
        &self,
        best: TrackPoint,
        aos: DateTime<Utc>,
        los: DateTime<Utc>,
    ) -> Result<TrackPoint, PredictError> {
        let mut low = best
            .time
            .checked_sub_signed(self.options.step)
            .map_or(aos, |t| t.max(aos));
        let mut high = best
            .time
            .checked_add_signed(self.options.step)
            .map_or(los, |t| t.min(los));
        let mut top = best;

        while high - low > self.options.precision {
            let third = (high - low) / 3;
            let left = self.sample(low + third)?;
            let right = self.sample(high - third)?;
            if left.elevation_deg < right.elevation_deg {
                low = left.time;
            } else {
                high = right.time;
            }
            for candidate in [left, right] {
                if candidate.elevation_deg > top.elevation_deg {
                    top = candidate;
                }
            }
        }

        Ok(top)
    }
}

/// Lazy, ordered sequence of passes whose AOS falls inside a window.
/// Ends at the first error; cannot be restarted.
pub struct PassSeries<'a, G: ?Sized> {
    ctx: SearchContext<'a, G>,
    satellite_name: String,
    window: SearchWindow,
    cursor: DateTime<Utc>,
    current_day: Option<NaiveDate>,
    found: usize,
    done: bool,
}

impl<'a, G: Geometry + ?Sized> PassSeries<'a, G> {
    pub fn new(ctx: SearchContext<'a, G>, satellite_name: &str, window: SearchWindow) -> Self {
        Self {
            ctx,
            satellite_name: satellite_name.to_string(),
            cursor: window.start,
            window,
            current_day: None,
            found: 0,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        log::info!(
            "{}: {} passes between {} and {}",
            self.satellite_name,
            self.found,
            self.window.start,
            self.window.end
        );
    }
}

impl<G: Geometry + ?Sized> Iterator for PassSeries<'_, G> {
    type Item = Result<PassRecord, PredictError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let remaining = self.window.end - self.cursor;
        if remaining <= Duration::zero() {
            self.finish();
            return None;
        }

        match self
            .ctx
            .extract_pass(&self.satellite_name, self.cursor, remaining)
        {
            Ok((record, resume_at)) => {
                if !self.window.contains(record.aos_time) {
                    self.finish();
                    return None;
                }
                if self.current_day != Some(record.day) {
                    log::debug!("{}: passes on {}", self.satellite_name, record.day);
                    self.current_day = Some(record.day);
                }
                self.cursor = resume_at;
                self.found += 1;
                Some(Ok(record))
            }
            // Rising search ran to the window end: no more passes.
            Err(PredictError::NoCrossingFound {
                direction: Direction::Rising,
                horizon,
                ..
            }) if horizon == remaining => {
                self.finish();
                None
            }
            Err(e) => {
                self.done = true;
                log::warn!("{}: pass search failed: {}", self.satellite_name, e);
                Some(Err(e))
            }
        }
    }
}

impl<G: Geometry + ?Sized> FusedIterator for PassSeries<'_, G> {}

/// One pass starting the AOS search at `search_start`, bounded by
/// `options.horizon`.
pub fn extract_pass<G: Geometry + ?Sized>(
    observer: &Observer,
    geometry: &G,
    satellite_name: &str,
    search_start: DateTime<Utc>,
    options: &SearchOptions,
    abort: &AbortHandle,
) -> Result<(PassRecord, DateTime<Utc>), PredictError> {
    options.validate()?;
    SearchContext::new(geometry, observer, options, abort).extract_pass(
        satellite_name,
        search_start,
        options.horizon,
    )
}

/// All passes with AOS inside `window`, ascending.
pub fn enumerate_passes<'a, G: Geometry + ?Sized>(
    observer: &'a Observer,
    geometry: &'a G,
    satellite_name: &str,
    window: SearchWindow,
    options: &'a SearchOptions,
    abort: &'a AbortHandle,
) -> Result<PassSeries<'a, G>, PredictError> {
    options.validate()?;
    Ok(PassSeries::new(
        SearchContext::new(geometry, observer, options, abort),
        satellite_name,
        window,
    ))
}

/// Buckets records by their AOS day, keeping search order within a day.
pub fn passes_by_day(records: &[PassRecord]) -> BTreeMap<NaiveDate, Vec<&PassRecord>> {
    let mut days: BTreeMap<NaiveDate, Vec<&PassRecord>> = BTreeMap::new();
    for record in records {
        days.entry(record.day).or_default().push(record);
    }
    days
}
