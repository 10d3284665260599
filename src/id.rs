//! Trash id generation.
//!
//! Ids look like `<unix-seconds>_<random-alnum>`. The random suffix keeps
//! same-second bursts apart; the timestamp keeps ids roughly sortable.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 12;

/// Builds a filesystem-safe id for the given instant.
pub fn generate(now: SystemTime) -> String {
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .filter(|c| is_safe_char(*c))
        .collect();
    if suffix.is_empty() {
        secs.to_string()
    } else {
        format!("{secs}_{suffix}")
    }
}

/// Whether `value` has the shape of a generated id rather than a name pattern.
pub fn looks_like_id(value: &str) -> bool {
    match value.split_once('_') {
        Some((secs, suffix)) => {
            !secs.is_empty()
                && secs.bytes().all(|b| b.is_ascii_digit())
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
        }
        None => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
