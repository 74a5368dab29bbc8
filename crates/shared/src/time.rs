use chrono::NaiveDateTime;

const ABBREVIATED_FORMAT: &str = "%-m/%-d @ %-I:%M:%S %p";

/// Formats a timestamp the way the dashboard shows it, e.g. `3/7 @ 4:05:09 PM`.
pub fn abbreviated(ts: &NaiveDateTime) -> String {
    ts.format(ABBREVIATED_FORMAT).to_string()
}
