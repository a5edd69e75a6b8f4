use chrono::{DateTime, Utc};

/// Render a byte count with decimal units, the way model sizes are usually
/// quoted (4.7 GB, not 4.4 GiB).
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[(f64, &str)] = &[(1e12, "TB"), (1e9, "GB"), (1e6, "MB"), (1e3, "KB")];

    let bytes = bytes as f64;
    for &(scale, unit) in UNITS {
        if bytes >= scale {
            return format!("{:.1} {unit}", bytes / scale);
        }
    }
    format!("{bytes:.0} B")
}

/// Humanize a timestamp relative to now, in either direction.
pub fn format_relative(dt: &DateTime<Utc>) -> String {
    let delta = Utc::now().signed_duration_since(*dt);
    let (magnitude, suffix) = if delta.num_seconds() >= 0 {
        (delta, "ago")
    } else {
        (-delta, "from now")
    };

    let text = if magnitude.num_days() > 0 {
        format!("{} days", magnitude.num_days())
    } else if magnitude.num_hours() > 0 {
        format!("{} hours", magnitude.num_hours())
    } else if magnitude.num_minutes() > 0 {
        format!("{} minutes", magnitude.num_minutes())
    } else {
        format!("{} seconds", magnitude.num_seconds().max(0))
    };

    format!("{text} {suffix}")
}

/// The short form of a model digest, as shown in listings.
pub fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
