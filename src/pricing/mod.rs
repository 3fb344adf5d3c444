//! Instrument pricing: bonds, options, option strategies, hedges and swaps.

pub mod bond;
pub mod hedge;
pub mod option;
pub mod strategy;
pub mod swap;
