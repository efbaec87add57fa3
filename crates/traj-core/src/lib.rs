pub mod error;
pub mod id;
pub mod schema;
pub mod trace;
pub mod trajectory;
pub mod types;

pub use error::{Result, TrajectoryError};
pub use schema::{parse_trajectory, validate_trajectory, ValidationReport, Violation};
pub use trace::{Contributor, TraceConversation, TraceFile, TraceRange, TraceRecord};
pub use types::*;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting should not fail")
}

/// Parse an RFC 3339 timestamp. Returns `None` for anything else.
pub fn parse_timestamp(ts: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(ts, &Rfc3339).ok()
}

/// `YYYY-MM` bucket for a timestamp, used to group completed trajectories.
pub fn month_bucket(ts: &str) -> Option<String> {
    let dt = parse_timestamp(ts)?.to_offset(time::UtcOffset::UTC);
    Some(format!("{:04}-{:02}", dt.year(), u8::from(dt.month())))
}
