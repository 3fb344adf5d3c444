//! Foundational types shared by every engine.

pub mod asset;
pub mod config;
pub mod error;
pub mod series;
pub mod stats;
pub mod yield_curve;
