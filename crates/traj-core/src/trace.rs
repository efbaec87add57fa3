//! Line-range attribution records produced by the trace generator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceRange {
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contributor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceConversation {
    pub contributor: Contributor,
    pub ranges: Vec<TraceRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceFile {
    pub path: String,
    pub conversations: Vec<TraceConversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceRecord {
    pub id: String,
    pub timestamp: String,
    /// Id of the trajectory this record attributes changes to.
    pub trajectory: String,
    pub files: Vec<TraceFile>,
}

impl TraceRecord {
    pub fn range_count(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| f.conversations.iter())
            .map(|c| c.ranges.len())
            .sum()
    }
}
