use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use std::collections::HashSet;

/// KRX settles its closing auction around 15:30 KST; until shortly
/// after that the current session has no usable close, so quote
/// requests target the previous session.
const SETTLED_CLOSE_KST: (u32, u32) = (16, 0);

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Most recent KRX session with a settled close as of `now_utc`.
pub fn latest_trading_date(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let kst = chrono::FixedOffset::east_opt(KST_OFFSET_SECS).context("invalid KST offset")?;
    let now = now_utc.with_timezone(&kst);

    let mut date = now.date_naive();
    if (now.hour(), now.minute()) < SETTLED_CLOSE_KST {
        date = date.pred_opt().context("date underflow")?;
    }

    let closed = closed_dates();
    while !is_session(date, &closed) {
        date = date.pred_opt().context("date underflow")?;
    }
    Ok(date)
}

fn is_session(date: NaiveDate, closed: &HashSet<NaiveDate>) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !closed.contains(&date)
}

fn closed_dates() -> HashSet<NaiveDate> {
    let mut closed: HashSet<NaiveDate> = HashSet::new();

    // Fixed recurring closures: New Year's Day, Christmas, and the
    // KRX year-end closing day. Movable lunar holidays must be
    // supplied via KRX_EXTRA_HOLIDAYS="YYYY-MM-DD,YYYY-MM-DD".
    for year in 2024..=2030 {
        closed.extend(NaiveDate::from_ymd_opt(year, 1, 1));
        closed.extend(NaiveDate::from_ymd_opt(year, 12, 25));
        closed.extend(NaiveDate::from_ymd_opt(year, 12, 31));
    }

    if let Ok(extra) = std::env::var("KRX_EXTRA_HOLIDAYS") {
        closed.extend(
            extra
                .split(',')
                .filter_map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()),
        );
    }

    closed
}
