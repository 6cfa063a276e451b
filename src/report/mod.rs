//! User-facing rendering of pass records: one row per pass in a display
//! time zone, CSV I/O, and polar plot data for the track.

mod csv_io;
mod polar;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{passes_by_day, PassRecord, TrackPoint};

pub use self::csv_io::{read_csv, to_csv_string, write_csv, ReportError};
pub use self::polar::{polar_track, PolarPoint};

/// One table/CSV row. Column names are the CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportRow {
    #[serde(rename = "Day")]
    pub day: NaiveDate,
    #[serde(rename = "AOS(local)", with = "clock")]
    #[schema(value_type = String, example = "21:16:05")]
    pub aos: NaiveTime,
    #[serde(rename = "LOS(local)", with = "clock")]
    #[schema(value_type = String)]
    pub los: NaiveTime,
    #[serde(rename = "MEL(deg)")]
    pub max_elevation_deg: Option<f64>,
    #[serde(rename = "T-MEL(local)", with = "clock_opt")]
    #[schema(value_type = Option<String>)]
    pub max_elevation_time: Option<NaiveTime>,
    #[serde(rename = "VTIME(s)")]
    pub duration_s: i64,
    #[serde(rename = "Satellite")]
    pub satellite: String,
}

impl ReportRow {
    pub fn aos_instant(&self, tz: FixedOffset) -> Option<DateTime<Utc>> {
        instant(self.day, self.aos, tz)
    }

    /// LOS clock times earlier than AOS belong to the following day.
    pub fn los_instant(&self, tz: FixedOffset) -> Option<DateTime<Utc>> {
        instant(self.rollover_day(self.los)?, self.los, tz)
    }

    pub fn max_elevation_instant(&self, tz: FixedOffset) -> Option<DateTime<Utc>> {
        let time = self.max_elevation_time?;
        instant(self.rollover_day(time)?, time, tz)
    }

    fn rollover_day(&self, time: NaiveTime) -> Option<NaiveDate> {
        if time < self.aos {
            self.day.succ_opt()
        } else {
            Some(self.day)
        }
    }
}

fn instant(day: NaiveDate, time: NaiveTime, tz: FixedOffset) -> Option<DateTime<Utc>> {
    day.and_time(time)
        .and_local_timezone(tz)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Full record for plotting consumers; the row plus the track.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PassReport {
    pub row: ReportRow,
    pub track: Vec<TrackPoint>,
    pub polar: Vec<PolarPoint>,
}

impl PassReport {
    pub fn new(record: &PassRecord, tz: FixedOffset) -> Self {
        Self {
            row: format_pass(record, tz),
            track: record.track.clone(),
            polar: polar_track(record),
        }
    }
}

pub fn format_pass(record: &PassRecord, tz: FixedOffset) -> ReportRow {
    let aos = to_local_second(record.aos_time, tz);
    ReportRow {
        day: aos.date_naive(),
        aos: aos.time(),
        los: to_local_second(record.los_time, tz).time(),
        max_elevation_deg: record.max_elevation_deg.map(round2),
        max_elevation_time: record
            .max_elevation_time
            .map(|t| to_local_second(t, tz).time()),
        duration_s: record.duration_seconds.round() as i64,
        satellite: record.satellite_name.clone(),
    }
}

pub fn format_passes(records: &[PassRecord], tz: FixedOffset) -> Vec<ReportRow> {
    records.iter().map(|r| format_pass(r, tz)).collect()
}

/// Plain-text table, one block per AOS day.
pub fn render_table(records: &[PassRecord], tz: FixedOffset) -> String {
    let mut out = format!(
        "{:<10}  {:>10}  {:>10}  {:>8}  {:>12}  {:>8}  {}\n",
        "Day", "AOS(local)", "LOS(local)", "MEL(deg)", "T-MEL(local)", "VTIME(s)", "Satellite"
    );
    for (i, (_, passes)) in passes_by_day(records).into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for record in passes {
            let row = format_pass(record, tz);
            out.push_str(&format!(
                "{:<10}  {:>10}  {:>10}  {:>8}  {:>12}  {:>8}  {}\n",
                row.day,
                row.aos.format(CLOCK_FORMAT).to_string(),
                row.los.format(CLOCK_FORMAT).to_string(),
                row.max_elevation_deg
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "-".into()),
                row.max_elevation_time
                    .map(|t| t.format(CLOCK_FORMAT).to_string())
                    .unwrap_or_else(|| "-".into()),
                row.duration_s,
                row.satellite
            ));
        }
    }
    out
}

const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Truncates so the rendered clock never moves past the instant's own day.
fn to_local_second(at: DateTime<Utc>, tz: FixedOffset) -> DateTime<FixedOffset> {
    at.trunc_subsecs(0).with_timezone(&tz)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::CLOCK_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(CLOCK_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(d)?;
        NaiveTime::parse_from_str(&s, CLOCK_FORMAT).map_err(serde::de::Error::custom)
    }
}

mod clock_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::CLOCK_FORMAT;

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format(CLOCK_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(s) if !s.trim().is_empty() => NaiveTime::parse_from_str(s.trim(), CLOCK_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
