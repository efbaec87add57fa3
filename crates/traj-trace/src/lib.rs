//! Line-range attribution of VCS changes to trajectories.

pub mod config;
pub mod diff;
pub mod generator;
pub mod vcs;

pub use config::TraceConfig;
pub use diff::{parse_unified_diff, FileRanges, LineRange};
pub use generator::TraceGenerator;
pub use vcs::{GitCli, Vcs};
