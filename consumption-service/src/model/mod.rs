pub mod series;

use time::{Date, OffsetDateTime, UtcOffset};
use water_client::domain::{AccountData, AlertSettings, DailyReading, MonthlyReading};

pub use series::{SeriesError, StatisticsSeries};

/// Values derived from one account snapshot. Rebuilt wholesale on every
/// refresh; nothing carries over from a previous build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedSnapshot {
    pub last_index_m3: Option<f64>,
    pub last_daily_liters: Option<i64>,
    pub last_daily_m3: Option<f64>,
    pub monthly_latest_m3: Option<f64>,
    pub annual_total_m3: Option<f64>,
    pub last_date: Option<Date>,
    pub daily_reliability: Option<String>,
    pub monthly_reliability: Option<String>,
    pub today_liters: Option<i64>,
    pub today_m3: Option<f64>,
    pub today_reliability: Option<String>,
    pub series: StatisticsSeries,
}

/// What adapters read: the computed snapshot plus the account fields they
/// need, nothing else from the raw payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumptionModel {
    pub subscription_id: Option<String>,
    pub alert_settings: AlertSettings,
    pub computed: ComputedSnapshot,
}

/// Local wall-clock time, falling back to UTC when the local offset cannot
/// be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Turns raw account data into a [`ConsumptionModel`].
///
/// `now` is the wall-clock instant of the build. It decides the calendar
/// year summed into `annual_total_m3` and, converted to UTC, the last day
/// the index series is forward-filled to. Building never fails: malformed
/// readings are skipped and a failing series phase leaves all series empty.
#[derive(Debug, Clone, Copy)]
pub struct ConsumptionModelBuilder {
    now: OffsetDateTime,
}

impl ConsumptionModelBuilder {
    pub fn new(now: OffsetDateTime) -> Self {
        Self { now }
    }

    pub fn from_system_clock() -> Self {
        Self::new(local_now())
    }

    /// `today` selects the reading reported as today's consumption and
    /// defaults to the local date of `now`.
    pub fn build(&self, raw: &AccountData, today: Option<Date>) -> ConsumptionModel {
        let daily = raw.daily_consumption.as_slice();
        let monthly = raw.monthly_consumption.as_slice();
        let today = today.unwrap_or_else(|| self.now.date());

        tracing::debug!(
            daily = daily.len(),
            monthly = monthly.len(),
            %today,
            "building consumption model"
        );

        let last_daily = daily.last();
        let last_month = monthly.last();

        let (today_liters, today_m3, today_reliability) = match find_last_for_date(daily, today) {
            Some(reading) => (
                Some(reading.consumption.litre.unwrap_or(0)),
                Some(reading.consumption.m3.unwrap_or(0.0)),
                reading.index_reliability.clone(),
            ),
            None => (None, None, None),
        };

        let today_utc = self.now.to_offset(UtcOffset::UTC).date();
        let series = match series::derive(daily, monthly, today_utc) {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(error = %e, "failed to compute statistics series, discarding them");
                StatisticsSeries::default()
            }
        };

        let computed = ComputedSnapshot {
            last_index_m3: last_daily
                .and_then(|r| r.index.m3)
                .or_else(|| last_month.and_then(|r| r.index.m3)),
            last_daily_liters: last_daily.and_then(|r| r.consumption.litre),
            last_daily_m3: last_daily.and_then(|r| r.consumption.m3),
            monthly_latest_m3: last_month.and_then(|r| r.consumption.m3),
            annual_total_m3: annual_total_m3(monthly, self.now.year()),
            last_date: last_daily.and_then(DailyReading::reading_date),
            daily_reliability: last_daily.and_then(|r| r.index_reliability.clone()),
            monthly_reliability: last_month.and_then(|r| r.consumption_reliability.clone()),
            today_liters,
            today_m3,
            today_reliability,
            series,
        };

        ConsumptionModel {
            subscription_id: raw.subscription_id.clone(),
            alert_settings: raw.alert_settings.clone(),
            computed,
        }
    }
}

/// Sum of monthly m³ for `year`; `None` without any monthly reading.
fn annual_total_m3(monthly: &[MonthlyReading], year: i32) -> Option<f64> {
    if monthly.is_empty() {
        return None;
    }
    let total = monthly
        .iter()
        .filter(|m| m.year == Some(year))
        .map(|m| m.consumption.m3.unwrap_or(0.0))
        .sum::<f64>();
    total.is_finite().then_some(total)
}

/// Last reading dated `date`. Later entries win over earlier duplicates.
fn find_last_for_date(daily: &[DailyReading], date: Date) -> Option<&DailyReading> {
    daily.iter().rev().find(|r| r.reading_date() == Some(date))
}
