//! Routing session plumbing for the commands.

mod input;
mod setup;
mod stats;

pub use input::{parse_line, InputLine, SignalTable};
pub use setup::{build, RoutingContext};
pub use stats::RunStats;
