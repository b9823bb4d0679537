//! Small display and validation helpers for node data.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^did:[a-z0-9]+:[a-zA-Z0-9._-]+$").expect("valid DID regex"));

/// Check that `did` looks like `did:<method>:<id>`.
pub fn is_valid_did(did: &str) -> bool {
    DID_RE.is_match(did)
}

/// Format a mana balance with a K/M suffix.
///
/// ```
/// use icn_realtime::models::util::format_mana;
/// assert_eq!(format_mana(950.0), "950");
/// assert_eq!(format_mana(1500.0), "1.5K");
/// assert_eq!(format_mana(2_300_000.0), "2.3M");
/// ```
pub fn format_mana(balance: f64) -> String {
    if balance >= 1_000_000.0 {
        format!("{:.1}M", balance / 1_000_000.0)
    } else if balance >= 1_000.0 {
        format!("{:.1}K", balance / 1_000.0)
    } else if balance.fract() == 0.0 {
        format!("{:.0}", balance)
    } else {
        balance.to_string()
    }
}

/// Time left until `deadline`, as shown next to a voting proposal.
///
/// Returns `Expired`, `Nd Nh`, `Nh Nm` or `Nm`.
pub fn time_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = deadline - now;
    if diff.num_milliseconds() <= 0 {
        return "Expired".to_string();
    }

    let days = diff.num_days();
    let hours = diff.num_hours() % 24;
    let minutes = diff.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
