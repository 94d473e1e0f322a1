use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

pub const UNIT_CUBIC_METERS: &str = "m³";
pub const UNIT_LITERS: &str = "L";

/// One long-term statistics row: the period starting at `start` (UTC
/// midnight), its value and the running total up to and including it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint<T> {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    pub state: T,
    pub sum: T,
}

impl<T> StatisticPoint<T> {
    pub fn at_midnight(date: Date, state: T, sum: T) -> Self {
        Self {
            start: date.midnight().assume_utc(),
            state,
            sum,
        }
    }

    pub fn date(&self) -> Date {
        self.start.date()
    }
}

/// Aggregation mode requested from the statistics importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanType {
    /// Sum only.
    None,
    /// Mean and sum.
    Arithmetic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticMetadata {
    pub statistic_id: String,
    pub source: String,
    pub name: Option<String>,
    pub unit_of_measurement: String,
    pub has_sum: bool,
    pub mean_type: MeanType,
}

impl StatisticMetadata {
    pub fn sum_only(statistic_id: impl Into<String>, unit: &str) -> Self {
        Self::new(statistic_id.into(), unit, MeanType::None)
    }

    pub fn mean_and_sum(statistic_id: impl Into<String>, unit: &str) -> Self {
        Self::new(statistic_id.into(), unit, MeanType::Arithmetic)
    }

    fn new(statistic_id: String, unit: &str, mean_type: MeanType) -> Self {
        Self {
            statistic_id,
            source: "recorder".to_string(),
            name: None,
            unit_of_measurement: unit.to_string(),
            has_sum: true,
            mean_type,
        }
    }
}

/// Payload handed to the host's statistics importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsImport<T> {
    pub metadata: StatisticMetadata,
    pub statistics: Vec<StatisticPoint<T>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn point_starts_at_utc_midnight() {
        let p = StatisticPoint::at_midnight(date!(2024 - 03 - 31), 1.5, 10.0);
        assert_eq!(p.start, datetime!(2024-03-31 00:00:00 UTC));
        assert_eq!(p.date(), date!(2024 - 03 - 31));
    }

    #[test]
    fn point_serializes_start_as_rfc3339() {
        let p = StatisticPoint::at_midnight(date!(2024 - 01 - 02), 40_i64, 90_i64);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["start"], "2024-01-02T00:00:00Z");
        assert_eq!(json["sum"], 90);
    }
}
