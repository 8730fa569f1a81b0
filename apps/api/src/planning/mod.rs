//! Content planning: the weekly pattern and the monthly plan built from it.

pub mod handlers;
pub mod plan;
pub mod weekly;
