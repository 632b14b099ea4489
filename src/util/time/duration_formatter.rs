use chrono::{DateTime, Utc};

/// `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_duration(duration: std::time::Duration) -> String {
    let total = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3_600,
        (total % 3_600) / 60,
        total % 60,
    );

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}.{:03}s", duration.subsec_millis())
    }
}

pub fn format_dt_difference(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    match (to - from).to_std() {
        Ok(duration) => format_duration(duration),
        Err(_) => String::from("0.000s"),
    }
}
