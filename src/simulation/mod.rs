//! Monte Carlo price paths and scenario stress tests.

pub mod gbm;
