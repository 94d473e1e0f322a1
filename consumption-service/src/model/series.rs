//! Long-term statistics series derived from raw readings.
//!
//! Daily and monthly series follow input order with a running total. The
//! index series carries the cumulative meter index as its own sum and is
//! forward-filled so it holds one point per calendar day up to today.

use time::Date;
use water_client::domain::{DailyReading, MonthlyReading, StatisticPoint};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("date arithmetic out of range after {0}")]
    DateOutOfRange(Date),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsSeries {
    pub daily_liters: Vec<StatisticPoint<i64>>,
    pub monthly_m3: Vec<StatisticPoint<f64>>,
    pub index_m3: Vec<StatisticPoint<f64>>,
}

impl StatisticsSeries {
    pub fn is_empty(&self) -> bool {
        self.daily_liters.is_empty() && self.monthly_m3.is_empty() && self.index_m3.is_empty()
    }
}

pub fn derive(
    daily: &[DailyReading],
    monthly: &[MonthlyReading],
    today_utc: Date,
) -> Result<StatisticsSeries, SeriesError> {
    Ok(StatisticsSeries {
        daily_liters: daily_liters(daily),
        monthly_m3: monthly_m3(monthly),
        index_m3: index_m3(daily, today_utc)?,
    })
}

/// Daily consumption in liters, one point per dated reading.
pub fn daily_liters(daily: &[DailyReading]) -> Vec<StatisticPoint<i64>> {
    let mut total: i64 = 0;
    daily
        .iter()
        .filter_map(|reading| {
            let date = reading.reading_date()?;
            let liters = reading.consumption.litre.unwrap_or(0);
            total = total.saturating_add(liters);
            Some(StatisticPoint::at_midnight(date, liters, total))
        })
        .collect()
}

/// Monthly consumption in m³, one point per month at day 1.
pub fn monthly_m3(monthly: &[MonthlyReading]) -> Vec<StatisticPoint<f64>> {
    let mut total = 0.0;
    monthly
        .iter()
        .filter_map(|reading| {
            let start = reading.period_start()?;
            let m3 = reading.consumption.m3.unwrap_or(0.0);
            total += m3;
            Some(StatisticPoint::at_midnight(start, m3, total))
        })
        .collect()
}

/// Meter index in m³, forward-filled across missing days and up to
/// `today_utc` inclusive.
///
/// Readings without a usable date or index are skipped, never zero-filled.
/// Gaps of any length are filled. Two readings sharing a date both produce a
/// point for that day, in input order; the provider does not send such
/// duplicates and later statistics rows replace earlier ones on import.
pub fn index_m3(
    daily: &[DailyReading],
    today_utc: Date,
) -> Result<Vec<StatisticPoint<f64>>, SeriesError> {
    let mut points = Vec::with_capacity(daily.len());
    let mut last: Option<(Date, f64)> = None;

    for reading in daily {
        let (Some(date), Some(index)) = (reading.reading_date(), reading.index.m3) else {
            continue;
        };

        if let Some((last_date, last_index)) = last {
            let gap = (date - last_date).whole_days();
            if gap > 1 {
                fill_forward(&mut points, last_date, gap - 1, last_index)?;
            }
        }

        points.push(StatisticPoint::at_midnight(date, index, index));
        last = Some((date, index));
    }

    if let Some((last_date, last_index)) = last {
        let gap = (today_utc - last_date).whole_days();
        if gap >= 1 {
            fill_forward(&mut points, last_date, gap, last_index)?;
        }
    }

    Ok(points)
}

/// Push `days` flat points for the days following `after`.
fn fill_forward(
    points: &mut Vec<StatisticPoint<f64>>,
    after: Date,
    days: i64,
    index: f64,
) -> Result<(), SeriesError> {
    let mut day = after;
    for _ in 0..days {
        day = day.next_day().ok_or(SeriesError::DateOutOfRange(day))?;
        points.push(StatisticPoint::at_midnight(day, index, index));
    }
    Ok(())
}
