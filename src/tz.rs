//! Timezone helpers: everything is stored in UTC and converted to the
//! user's IANA timezone only at the display and scheduling edges.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Common timezones offered as buttons in the settings menu.
/// Display label first, IANA name second.
pub const COMMON_TIMEZONES: &[(&str, &str)] = &[
    ("Калининград (UTC+2)", "Europe/Kaliningrad"),
    ("Москва (UTC+3)", "Europe/Moscow"),
    ("Самара (UTC+4)", "Europe/Samara"),
    ("Екатеринбург (UTC+5)", "Asia/Yekaterinburg"),
    ("Омск (UTC+6)", "Asia/Omsk"),
    ("Красноярск (UTC+7)", "Asia/Krasnoyarsk"),
    ("Иркутск (UTC+8)", "Asia/Irkutsk"),
    ("Якутск (UTC+9)", "Asia/Yakutsk"),
    ("Владивосток (UTC+10)", "Asia/Vladivostok"),
    ("Магадан (UTC+11)", "Asia/Magadan"),
    ("Камчатка (UTC+12)", "Asia/Kamchatka"),
];

/// Validate an IANA timezone name.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

/// Resolve a profile's timezone, falling back to UTC when the stored name
/// is missing or no longer valid.
pub fn user_tz(tz_name: &str) -> Tz {
    match parse_timezone(tz_name) {
        Some(tz) => tz,
        None => {
            warn!(timezone = %tz_name, "unknown timezone in profile, falling back to UTC");
            Tz::UTC
        }
    }
}

/// Format a UTC instant for the user: `%d.%m.%Y %H:%M (%Z)` in their
/// timezone.
pub fn format_datetime_for_user(dt: DateTime<Utc>, tz_name: &str) -> String {
    let tz = user_tz(tz_name);
    dt.with_timezone(&tz)
        .format("%d.%m.%Y %H:%M (%Z)")
        .to_string()
}

/// The current wall-clock time in the user's timezone.
pub fn local_now(tz_name: &str) -> DateTime<Tz> {
    Utc::now().with_timezone(&user_tz(tz_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn common_timezones_are_all_valid() {
        for (label, name) in COMMON_TIMEZONES {
            assert!(
                parse_timezone(name).is_some(),
                "{label} maps to unknown timezone {name}"
            );
        }
    }

    #[test]
    fn formats_in_user_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
        let formatted = format_datetime_for_user(dt, "Europe/Moscow");
        // Moscow is UTC+3 year-round
        assert!(formatted.starts_with("08.03.2024 15:00"), "{formatted}");
        assert!(formatted.contains("MSK"), "{formatted}");
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
        let formatted = format_datetime_for_user(dt, "Invalid/Timezone");
        assert!(formatted.starts_with("08.03.2024 12:00"), "{formatted}");
    }

    #[test]
    fn accepts_any_iana_name() {
        assert!(parse_timezone("America/New_York").is_some());
        assert!(parse_timezone("Asia/Tashkent").is_some());
        assert!(parse_timezone("Mars/Olympus").is_none());
    }
}
