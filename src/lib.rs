//! Satellite pass prediction for a fixed ground station.
//!
//! `predict` finds threshold crossings and assembles passes, `report`
//! renders them, and `web` serves both over HTTP.

pub mod abort;
pub mod config;
pub mod predict;
pub mod report;
pub mod web;
