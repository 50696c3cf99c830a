//! Source revision lookup for the metadata record.
//!
//! Resolution order: the repository's `.git/HEAD` (following one symbolic
//! ref, with `packed-refs` as fallback), then `GITHUB_SHA`. A repository
//! without either yields no revision.

use std::env;
use std::fs;
use std::path::Path;

pub const REVISION_ENV: &str = "GITHUB_SHA";

pub fn read_revision(root: &Path) -> Option<String> {
    from_git(root).or_else(from_env)
}

fn from_env() -> Option<String> {
    env::var(REVISION_ENV)
        .ok()
        .map(|sha| sha.trim().to_string())
        .filter(|sha| !sha.is_empty())
}

fn from_git(root: &Path) -> Option<String> {
    let git_dir = root.join(".git");
    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    if let Some(reference) = head.strip_prefix("ref:") {
        let reference = reference.trim();
        let resolved = fs::read_to_string(git_dir.join(reference))
            .ok()
            .map(|sha| sha.trim().to_string())
            .filter(|sha| !sha.is_empty())
            .or_else(|| packed_ref(&git_dir, reference));
        if resolved.is_none() {
            tracing::debug!(reference, "HEAD ref could not be resolved");
        }
        return resolved;
    }

    is_hex_prefix(head).then(|| head.to_string())
}

/// Detached HEAD contents are accepted when the first 7 characters are hex.
fn is_hex_prefix(value: &str) -> bool {
    value.len() >= 7 && value.chars().take(7).all(|c| c.is_ascii_hexdigit())
}

fn packed_ref(git_dir: &Path, reference: &str) -> Option<String> {
    let packed = fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| name.trim() == reference)
        .map(|(sha, _)| sha.trim().to_string())
}
