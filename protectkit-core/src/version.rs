//! The server reports its semantic version in the [`VERSION_HEADER`] of every successful
//! response. A response is accepted when that version falls inside the client's expected
//! `major.minor` line, or when the server is an unversioned development build reporting
//! [`UNVERSIONED`].

use reqwest::header::HeaderMap;
use semver::{Version, VersionReq};

use crate::error::{ProtectKitError, ProtectKitResult};

/// Response header carrying the server's semantic version.
pub const VERSION_HEADER: &str = "x-api-version";

/// Version reported by development servers; always accepted.
pub const UNVERSIONED: &str = "v0.0.0";

/// Whether `actual` satisfies `expected || v0.0.0`.
///
/// `expected` is a version line such as `v0.2`, meaning `>=0.2.0, <0.3.0`. A leading `v`
/// is optional on both sides. Pre-releases and unparseable versions never match the line.
#[must_use]
pub fn is_compatible(expected: &str, actual: &str) -> bool {
    let Ok(version) = Version::parse(strip_prefix(actual)) else {
        return false;
    };
    if version == Version::new(0, 0, 0) {
        return true;
    }
    VersionReq::parse(strip_prefix(expected)).is_ok_and(|line| line.matches(&version))
}

/// Checks the version header of a successful response.
///
/// # Errors
/// Returns [`ProtectKitError::VersionMismatch`] naming both versions when the header is
/// missing, unreadable or outside the expected line.
pub fn check_version(expected: &str, headers: &HeaderMap) -> ProtectKitResult<()> {
    let actual = headers
        .get(VERSION_HEADER)
        .map(|value| value.to_str().unwrap_or("unreadable"))
        .unwrap_or("missing");

    if is_compatible(expected, actual) {
        return Ok(());
    }

    log::warn!("server version {actual} does not satisfy {expected}");
    Err(ProtectKitError::VersionMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

fn strip_prefix(version: &str) -> &str {
    let version = version.trim();
    version.strip_prefix('v').unwrap_or(version)
}
