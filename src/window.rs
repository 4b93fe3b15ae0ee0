use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone};

/// Asia/Shanghai has been UTC+08:00 without DST since 1991.
pub fn shanghai() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("+08:00 is a valid offset")
}

/// Inclusive civil-date range in the Shanghai calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window of `days` calendar days ending on the civil date of `now` in Shanghai.
    pub fn ending_at<Tz: TimeZone>(now: &DateTime<Tz>, days: u32) -> anyhow::Result<Self> {
        if days == 0 {
            anyhow::bail!("day count must be at least 1");
        }
        let today = now.with_timezone(&shanghai()).date_naive();
        let start = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| anyhow::anyhow!("{days} days before {today} is out of range"))?;
        Ok(Self { start, end: today })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_before_start(&self, date: NaiveDate) -> bool {
        date < self.start
    }
}

pub fn civil_date<Tz: TimeZone>(at: &DateTime<Tz>) -> NaiveDate {
    at.with_timezone(&shanghai()).date_naive()
}
