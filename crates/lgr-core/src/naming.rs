//! Default log group naming
//!
//! When a definition does not name its log group, the name is derived from
//! the project, repository and component coordinates.

use sha2::{Digest, Sha256};

/// Default maximum name length
pub const DEFAULT_MAX_NAME_CHARS: usize = 255;

/// Length of the hash suffix appended to truncated names
const SUFFIX_HEX_CHARS: usize = 8;

/// Whether `c` is allowed in a log group name
#[inline]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | '#')
}

/// Derive a service-safe name from naming coordinates
///
/// Characters outside the log group alphabet become `-`. Names longer than
/// `max_chars` are truncated and suffixed with a short digest of the full
/// name, so the result is stable across invocations.
#[must_use]
pub fn component_safe_name(
    project_code: &str,
    repo_id: &str,
    component_name: &str,
    max_chars: usize,
) -> String {
    let full: String = [project_code, repo_id, component_name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .map(|c| if is_name_char(c) { c } else { '-' })
        .collect();

    if full.len() <= max_chars {
        return full;
    }

    let digest = hex::encode(Sha256::digest(full.as_bytes()));
    let suffix = &digest[..SUFFIX_HEX_CHARS];
    // all chars are ASCII here, so byte slicing is on char boundaries
    let keep = max_chars.saturating_sub(SUFFIX_HEX_CHARS + 1);
    format!("{}-{suffix}", &full[..keep])
}
