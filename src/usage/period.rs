use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use std::str::FromStr;

/// Quota reset window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsagePeriod {
    /// Calendar month in UTC, key `YYYY-MM`
    #[default]
    Monthly,
    /// Calendar day in UTC, key `YYYY-MM-DD`
    Daily,
}

impl UsagePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsagePeriod::Monthly => "monthly",
            UsagePeriod::Daily => "daily",
        }
    }

    /// Key of the period containing `now`
    pub fn key(&self, now: DateTime<Utc>) -> String {
        match self {
            UsagePeriod::Monthly => now.format("%Y-%m").to_string(),
            UsagePeriod::Daily => now.format("%Y-%m-%d").to_string(),
        }
    }

    /// First instant of the period after the one containing `now`
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let next = match self {
            UsagePeriod::Monthly => {
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            UsagePeriod::Daily => today.checked_add_days(Days::new(1)),
        };

        next.and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl FromStr for UsagePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(UsagePeriod::Monthly),
            "daily" | "day" => Ok(UsagePeriod::Daily),
            other => Err(format!("Unknown usage period '{}'", other)),
        }
    }
}
