use chrono::{DateTime, Local, TimeZone, Timelike};

pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        4..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Greeting for the wall-clock hour of `now` in its own time zone.
pub fn greeting<Tz: TimeZone>(now: &DateTime<Tz>) -> &'static str {
    greeting_for_hour(now.hour())
}

pub fn greeting_now() -> &'static str {
    greeting(&Local::now())
}
