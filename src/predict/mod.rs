mod catalog;
mod crossing;
mod element_set;
mod error;
mod geometry;
mod observer;
mod pass_finder;
mod request;
mod types;

pub use catalog::Catalog;
pub use crossing::{find_crossing, SearchContext};
pub use element_set::{parse_catalog, ElementSet};
pub use error::PredictError;
pub use geometry::{Geometry, Sgp4Geometry};
pub use observer::Observer;
pub use pass_finder::{enumerate_passes, extract_pass, passes_by_day, PassSeries};
pub use request::PassRequest;
pub use types::{
    utc_offset, Direction, LookAngles, PassRecord, SearchOptions, SearchWindow, TrackPoint,
};

#[cfg(test)]
pub(crate) use element_set::tests as fixtures;
