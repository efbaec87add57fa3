//! Prefixed random identifiers for trajectories, chapters, and traces.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 12;

pub const TRAJECTORY_PREFIX: &str = "traj_";
pub const CHAPTER_PREFIX: &str = "chap_";
pub const TRACE_PREFIX: &str = "trace_";

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn new_trajectory_id() -> String {
    format!("{TRAJECTORY_PREFIX}{}", random_suffix(ID_LEN))
}

pub fn new_chapter_id() -> String {
    format!("{CHAPTER_PREFIX}{}", random_suffix(ID_LEN))
}

pub fn new_trace_id() -> String {
    format!("{TRACE_PREFIX}{}", random_suffix(ID_LEN))
}

/// True if `id` is `prefix` followed by one or more `[a-z0-9]` characters.
pub fn has_id_shape(id: &str, prefix: &str) -> bool {
    match id.strip_prefix(prefix) {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        }
        None => false,
    }
}

/// Strict check for the 12-character trajectory id contract.
pub fn is_trajectory_id(id: &str) -> bool {
    has_id_shape(id, TRAJECTORY_PREFIX) && id.len() == TRAJECTORY_PREFIX.len() + ID_LEN
}
