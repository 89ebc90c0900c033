//! Presentation of plans, graphs and manifest diffs
//!
//! Planning and diffing themselves live in the `declarative` crate. This
//! module renders their results for the terminal.

pub mod differ;
pub mod planner;
