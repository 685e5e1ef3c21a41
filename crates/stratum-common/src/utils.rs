//! Stratum Utils - Utility Functions
//!
//! Id derivation and clock helpers shared across the Stratum components.
//!
//! @version 0.1.0
//! @author Stratum Development Team

use chrono::Utc;

// =============================================================================
// Clock
// =============================================================================

/// Current server time in milliseconds since the Unix epoch. Used to
/// backfill timestamps on rows that omit one.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// =============================================================================
// Id Derivation
// =============================================================================

/// Derive a valid entity/property id out of a display name: lowercased
/// slug plus a short hex suffix to keep repeated names distinct.
pub fn to_id(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    format!("{}-{}", slug, short_suffix())
}

/// Short hex suffix derived from the current clock.
fn short_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:04x}", (nanos ^ (nanos >> 17)) & 0xffff)
}

// =============================================================================
// Tests
// =============================================================================
