//! Minimal iCalendar RRULE support.
//!
//! The analysis prompt instructs the model to emit a narrow RRULE subset
//! (`FREQ`, `INTERVAL`, `BYDAY` with a single weekday, `BYMONTHDAY`), so
//! only that subset is parsed here. Anything else is treated as an opaque
//! recurring marker.

use chrono::{DateTime, Datelike, Duration, Months, Utc, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub by_weekday: Option<Weekday>,
    pub by_monthday: Option<u32>,
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse an RRULE string like `FREQ=WEEKLY;BYDAY=FR` or
/// `FREQ=MONTHLY;BYMONTHDAY=15`. Returns `None` when the string does not
/// carry a recognizable `FREQ`.
pub fn parse(rule: &str) -> Option<RecurrenceRule> {
    let mut freq = None;
    let mut interval = 1u32;
    let mut by_weekday = None;
    let mut by_monthday = None;

    for part in rule.trim().trim_start_matches("RRULE:").split(';') {
        let mut kv = part.splitn(2, '=');
        let (Some(key), Some(value)) = (kv.next(), kv.next()) else {
            continue;
        };
        match key.trim() {
            "FREQ" => {
                freq = match value.trim() {
                    "DAILY" => Some(Frequency::Daily),
                    "WEEKLY" => Some(Frequency::Weekly),
                    "MONTHLY" => Some(Frequency::Monthly),
                    "YEARLY" => Some(Frequency::Yearly),
                    _ => None,
                }
            }
            "INTERVAL" => interval = value.trim().parse().unwrap_or(1).max(1),
            "BYDAY" => by_weekday = weekday_from_code(value.trim()),
            "BYMONTHDAY" => by_monthday = value.trim().parse().ok(),
            _ => {}
        }
    }

    freq.map(|freq| RecurrenceRule {
        freq,
        interval,
        by_weekday,
        by_monthday,
    })
}

/// Short Russian label for displaying a recurring note.
pub fn humanize(rule: &str) -> String {
    let Some(parsed) = parse(rule) else {
        return "Повторяющаяся".to_string();
    };
    match (parsed.freq, parsed.interval) {
        (Frequency::Daily, 1) => "Каждый день".to_string(),
        (Frequency::Daily, n) => format!("Каждые {n} дн."),
        (Frequency::Weekly, 1) => "Каждую неделю".to_string(),
        (Frequency::Weekly, n) => format!("Каждые {n} нед."),
        (Frequency::Monthly, 1) => "Каждый месяц".to_string(),
        (Frequency::Monthly, n) => format!("Каждые {n} мес."),
        (Frequency::Yearly, 1) => "Каждый год".to_string(),
        (Frequency::Yearly, n) => format!("Каждые {n} г."),
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

impl RecurrenceRule {
    /// One step of the rule from `from`, preserving the time of day.
    fn advance(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.freq {
            Frequency::Daily => from.checked_add_signed(Duration::days(self.interval as i64)),
            Frequency::Weekly => match self.by_weekday {
                Some(weekday) => {
                    let mut next = from.checked_add_signed(Duration::days(1))?;
                    while next.weekday() != weekday {
                        next = next.checked_add_signed(Duration::days(1))?;
                    }
                    if self.interval > 1 {
                        next.checked_add_signed(Duration::weeks(self.interval as i64 - 1))
                    } else {
                        Some(next)
                    }
                }
                None => from.checked_add_signed(Duration::weeks(self.interval as i64)),
            },
            Frequency::Monthly => {
                let added = from.checked_add_months(Months::new(self.interval))?;
                match self.by_monthday {
                    Some(dom) => {
                        let clamped = dom.min(days_in_month(added.year(), added.month()));
                        added.with_day(clamped)
                    }
                    None => Some(added),
                }
            }
            Frequency::Yearly => from.checked_add_months(Months::new(12 * self.interval)),
        }
    }

    /// The next occurrence strictly after `now`, stepping from the note's
    /// current due date. Bounded to avoid spinning on degenerate rules.
    pub fn next_after(&self, current: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut cursor = current;
        for _ in 0..512 {
            cursor = self.advance(cursor)?;
            if cursor > now {
                return Some(cursor);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn parses_the_prompt_subset() {
        assert_eq!(
            parse("FREQ=DAILY"),
            Some(RecurrenceRule {
                freq: Frequency::Daily,
                interval: 1,
                by_weekday: None,
                by_monthday: None,
            })
        );
        let weekly = parse("FREQ=WEEKLY;BYDAY=FR").unwrap();
        assert_eq!(weekly.freq, Frequency::Weekly);
        assert_eq!(weekly.by_weekday, Some(Weekday::Fri));

        let monthly = parse("FREQ=MONTHLY;BYMONTHDAY=15").unwrap();
        assert_eq!(monthly.by_monthday, Some(15));

        let interval = parse("FREQ=WEEKLY;INTERVAL=3").unwrap();
        assert_eq!(interval.interval, 3);

        assert!(parse("garbage").is_none());
        assert!(parse("FREQ=HOURLY").is_none());
    }

    #[test]
    fn humanizes_in_russian() {
        assert_eq!(humanize("FREQ=DAILY"), "Каждый день");
        assert_eq!(humanize("FREQ=WEEKLY;BYDAY=FR"), "Каждую неделю");
        assert_eq!(humanize("FREQ=MONTHLY;BYMONTHDAY=15"), "Каждый месяц");
        assert_eq!(humanize("FREQ=YEARLY"), "Каждый год");
        assert_eq!(humanize("FREQ=WEEKLY;INTERVAL=3"), "Каждые 3 нед.");
        assert_eq!(humanize("something else"), "Повторяющаяся");
    }

    #[test]
    fn daily_advances_by_one_day() {
        let rule = parse("FREQ=DAILY").unwrap();
        let due = utc(2024, 5, 1, 9, 0);
        let next = rule.next_after(due, due).unwrap();
        assert_eq!(next, utc(2024, 5, 2, 9, 0));
    }

    #[test]
    fn next_skips_past_occurrences() {
        let rule = parse("FREQ=DAILY").unwrap();
        let due = utc(2024, 5, 1, 9, 0);
        let now = utc(2024, 5, 10, 12, 0);
        // Catches up past `now` instead of returning a stale slot
        assert_eq!(rule.next_after(due, now).unwrap(), utc(2024, 5, 11, 9, 0));
    }

    #[test]
    fn weekly_byday_lands_on_the_weekday() {
        let rule = parse("FREQ=WEEKLY;BYDAY=FR").unwrap();
        // 2024-05-01 is a Wednesday
        let due = utc(2024, 5, 1, 18, 30);
        let next = rule.next_after(due, due).unwrap();
        assert_eq!(next, utc(2024, 5, 3, 18, 30));
        assert_eq!(next.weekday(), Weekday::Fri);
    }

    #[test]
    fn monthly_bymonthday_clamps_short_months() {
        let rule = parse("FREQ=MONTHLY;BYMONTHDAY=31").unwrap();
        let due = utc(2024, 1, 31, 10, 0);
        let next = rule.next_after(due, due).unwrap();
        // February 2024 has 29 days
        assert_eq!(next, utc(2024, 2, 29, 10, 0));
    }

    #[test]
    fn yearly_preserves_date_and_time() {
        let rule = parse("FREQ=YEARLY").unwrap();
        let due = utc(2024, 6, 15, 8, 0);
        assert_eq!(rule.next_after(due, due).unwrap(), utc(2025, 6, 15, 8, 0));
    }
}
