use crate::abort::AbortHandle;
use crate::predict::element_set::ElementSet;
use crate::predict::error::PredictError;
use crate::predict::geometry::Sgp4Geometry;
use crate::predict::observer::Observer;
use crate::predict::pass_finder::enumerate_passes;
use crate::predict::types::{PassRecord, SearchOptions, SearchWindow};

/// Everything one pass search needs, owned by whoever issued it (a CLI
/// invocation or an HTTP request). Nothing is shared between requests.
#[derive(Debug, Clone)]
pub struct PassRequest {
    pub observer: Observer,
    pub element_set: ElementSet,
    pub window: SearchWindow,
    pub options: SearchOptions,
}

impl PassRequest {
    pub fn run(&self, abort: &AbortHandle) -> Result<Vec<PassRecord>, PredictError> {
        let geometry = Sgp4Geometry::new(&self.element_set)?;
        log::info!(
            "Predicting passes of {} (epoch {}) from {} to {}",
            self.element_set.name,
            geometry.epoch(),
            self.window.start,
            self.window.end
        );

        let series = enumerate_passes(
            &self.observer,
            &geometry,
            &self.element_set.name,
            self.window,
            &self.options,
            abort,
        )?;
        series.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::element_set::tests::iss;
    use chrono::{FixedOffset, NaiveDate};

    fn request() -> PassRequest {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2020, 7, 13).unwrap();
        PassRequest {
            observer: Observer::new(35.9864, 139.3739, 0.0).unwrap(),
            element_set: iss(),
            window: SearchWindow::from_local_dates(day, day, jst).unwrap(),
            options: SearchOptions {
                timezone: jst,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_run_is_deterministic() {
        let req = request();
        let first = req.run(&AbortHandle::new()).unwrap();
        let second = req.run(&AbortHandle::new()).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert!(first.iter().all(|p| p.satellite_name == "ISS (ZARYA)"));
    }

    #[test]
    fn test_run_rejects_bad_element_set() {
        let mut req = request();
        req.element_set = ElementSet::new(Some("BROKEN".into()), "1 x", "2 y");
        assert!(matches!(
            req.run(&AbortHandle::new()),
            Err(PredictError::MalformedElementSet { .. })
        ));
    }

    #[test]
    fn test_run_honours_abort() {
        let abort = AbortHandle::new();
        abort.abort();
        assert!(matches!(
            request().run(&abort),
            Err(PredictError::Cancelled { .. })
        ));
    }
}
