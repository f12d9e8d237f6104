pub mod funding;
pub mod schedule;
pub mod sweep;
