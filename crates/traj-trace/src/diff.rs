//! Unified diff parsing: new-side line ranges per changed file.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap()
});

/// Inclusive 1-based line range on the new side of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
    /// `sha256:<hex>` over the new-side lines of the hunk, when the diff carried them.
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRanges {
    pub path: String,
    pub ranges: Vec<LineRange>,
}

#[derive(Debug)]
struct Hunk {
    old_left: u32,
    new_left: u32,
    hasher: Option<Sha256>,
    saw_content: bool,
}

impl Hunk {
    fn done(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }
}

/// Parsed `@@ -a,b +c,d @@` counts.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32)> {
    let caps = HUNK_HEADER.captures(line)?;
    let count = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(1),
        }
    };
    let old_count = count(2)?;
    let new_start: u32 = caps.get(3)?.as_str().parse().ok()?;
    let new_count = count(4)?;
    Some((old_count, new_start, new_count))
}

/// `diff --git a/x b/y` → `y`. Without prefixes only the unambiguous
/// `diff --git x x` form is recognized; `+++` supplies the path otherwise.
fn path_from_git_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix("diff --git ")?;
    if let Some(idx) = rest.rfind(" b/") {
        return Some(unquote(&rest[idx + 3..]));
    }
    let half = rest.len().checked_sub(1)? / 2;
    let (left, right) = (rest.get(..half)?, rest.get(half + 1..)?);
    (rest.as_bytes().get(half) == Some(&b' ') && left == right).then(|| unquote(right))
}

fn unquote(path: &str) -> String {
    path.trim_matches('"').to_string()
}

fn finish_hunk(file: &mut FileRanges, hunk: Hunk) {
    if let (Some(hasher), true) = (hunk.hasher, hunk.saw_content) {
        if let Some(last) = file.ranges.last_mut() {
            last.content_hash = Some(format!("sha256:{}", hex::encode(hasher.finalize())));
        }
    }
}

fn parse(text: &str) -> Option<Vec<FileRanges>> {
    let mut files: Vec<FileRanges> = Vec::new();
    let mut current: Option<FileRanges> = None;
    let mut hunk: Option<Hunk> = None;

    for line in text.lines() {
        if let Some(h) = hunk.as_mut() {
            if !h.done() {
                match line.as_bytes().first() {
                    Some(b'+') => {
                        h.new_left = h.new_left.checked_sub(1)?;
                        if let Some(hasher) = h.hasher.as_mut() {
                            hasher.update(&line.as_bytes()[1..]);
                            hasher.update(b"\n");
                        }
                        h.saw_content = true;
                    }
                    Some(b'-') => h.old_left = h.old_left.checked_sub(1)?,
                    Some(b' ') | None => {
                        h.old_left = h.old_left.checked_sub(1)?;
                        h.new_left = h.new_left.checked_sub(1)?;
                        if let Some(hasher) = h.hasher.as_mut() {
                            hasher.update(line.get(1..).unwrap_or("").as_bytes());
                            hasher.update(b"\n");
                        }
                        h.saw_content = true;
                    }
                    Some(b'\\') => {}
                    _ => return None,
                }
                continue;
            }
            // `\ No newline at end of file` may trail a finished hunk.
            if line.starts_with('\\') {
                continue;
            }
            if let (Some(file), Some(done)) = (current.as_mut(), hunk.take()) {
                finish_hunk(file, done);
            }
        }

        if line.starts_with("diff --git ") {
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(FileRanges {
                path: path_from_git_header(line).unwrap_or_default(),
                ranges: Vec::new(),
            });
        } else if let Some(target) = line.strip_prefix("+++ ") {
            // Plain `diff -u` output has no `diff --git` line between files.
            if current.as_ref().is_some_and(|f| !f.ranges.is_empty()) {
                files.extend(current.take());
            }
            let file = current.get_or_insert_with(|| FileRanges {
                path: String::new(),
                ranges: Vec::new(),
            });
            if target != "/dev/null" {
                let target = unquote(target.split('\t').next().unwrap_or(target));
                file.path = target.strip_prefix("b/").unwrap_or(&target).to_string();
            }
        } else if line.starts_with("@@") {
            let file = current.as_mut()?;
            let (old_count, new_start, new_count) = parse_hunk_header(line)?;
            if new_count > 0 {
                file.ranges.push(LineRange {
                    start_line: new_start,
                    end_line: new_start.checked_add(new_count - 1)?,
                    content_hash: None,
                });
            }
            hunk = Some(Hunk {
                old_left: old_count,
                new_left: new_count,
                hasher: (new_count > 0).then(Sha256::new),
                saw_content: false,
            });
        }
    }

    if let (Some(file), Some(done)) = (current.as_mut(), hunk.take()) {
        finish_hunk(file, done);
    }
    if let Some(file) = current.take() {
        files.push(file);
    }
    files.retain(|f| !f.path.is_empty());
    Some(files)
}

/// Parse unified diff text into per-file new-side ranges.
///
/// Each hunk contributes `[newStart, newStart + newCount - 1]`; pure
/// deletions (`newCount == 0`) contribute nothing. Output that does not
/// parse as a diff yields an empty list.
pub fn parse_unified_diff(text: &str) -> Vec<FileRanges> {
    match parse(text) {
        Some(files) => files,
        None => {
            tracing::debug!("unparseable diff output, ignoring");
            Vec::new()
        }
    }
}
