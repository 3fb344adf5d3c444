//! Portfolio analytics and the sampled efficient frontier.

pub mod frontier;
pub mod portfolio;
