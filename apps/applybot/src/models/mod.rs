pub mod attempt;
pub mod control;
pub mod counters;
pub mod posting;
pub mod record;
pub mod snapshot;
