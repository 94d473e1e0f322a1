//! Shapes the model's series into payloads for the host's statistics importer.

use serde::Serialize;
use water_client::domain::{StatisticMetadata, StatisticsImport, UNIT_CUBIC_METERS, UNIT_LITERS};

use crate::model::ConsumptionModel;

/// Statistic ids of the three exported series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesIds {
    pub index: String,
    pub daily: String,
    pub monthly: String,
}

impl SeriesIds {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            index: format!("{prefix}_last_index"),
            daily: format!("{prefix}_daily_consumption"),
            monthly: format!("{prefix}_monthly_consumption"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesImport {
    Liters(StatisticsImport<i64>),
    CubicMeters(StatisticsImport<f64>),
}

impl SeriesImport {
    pub fn statistic_id(&self) -> &str {
        match self {
            Self::Liters(i) => &i.metadata.statistic_id,
            Self::CubicMeters(i) => &i.metadata.statistic_id,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Liters(i) => i.statistics.len(),
            Self::CubicMeters(i) => i.statistics.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Import payloads for every non-empty series.
///
/// The index and monthly series are sum-only; the daily series also asks
/// for a mean.
pub fn imports(model: &ConsumptionModel, ids: &SeriesIds) -> Vec<SeriesImport> {
    let series = &model.computed.series;
    let payloads = [
        SeriesImport::CubicMeters(StatisticsImport {
            metadata: StatisticMetadata::sum_only(&ids.index, UNIT_CUBIC_METERS),
            statistics: series.index_m3.clone(),
        }),
        SeriesImport::Liters(StatisticsImport {
            metadata: StatisticMetadata::mean_and_sum(&ids.daily, UNIT_LITERS),
            statistics: series.daily_liters.clone(),
        }),
        SeriesImport::CubicMeters(StatisticsImport {
            metadata: StatisticMetadata::sum_only(&ids.monthly, UNIT_CUBIC_METERS),
            statistics: series.monthly_m3.clone(),
        }),
    ];

    payloads
        .into_iter()
        .filter(|p| {
            if p.is_empty() {
                tracing::debug!(statistic_id = p.statistic_id(), "no statistics to import");
            }
            !p.is_empty()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConsumptionModelBuilder;
    use time::macros::datetime;
    use water_client::domain::{AccountData, DailyReading, MeanType, Measure};

    #[test]
    fn only_non_empty_series_are_exported() {
        let raw = AccountData {
            daily_consumption: vec![DailyReading {
                date: Some("2024-01-05".to_string()),
                consumption: Measure { litre: Some(12), m3: Some(0.012) },
                ..Default::default()
            }],
            ..Default::default()
        };
        let model = ConsumptionModelBuilder::new(datetime!(2024-01-05 12:00:00 UTC)).build(&raw, None);

        let payloads = imports(&model, &SeriesIds::with_prefix("sensor.water"));
        assert_eq!(payloads.len(), 1);
        let SeriesImport::Liters(daily) = &payloads[0] else {
            panic!("expected the liters series");
        };
        assert_eq!(daily.metadata.statistic_id, "sensor.water_daily_consumption");
        assert_eq!(daily.metadata.unit_of_measurement, "L");
        assert_eq!(daily.metadata.mean_type, MeanType::Arithmetic);
        assert_eq!(daily.statistics[0].sum, 12);
    }

    #[test]
    fn payload_serializes_flat() {
        let raw = AccountData {
            daily_consumption: vec![DailyReading {
                date: Some("2024-01-05".to_string()),
                index: Measure { litre: None, m3: Some(7.5) },
                ..Default::default()
            }],
            ..Default::default()
        };
        let model = ConsumptionModelBuilder::new(datetime!(2024-01-05 12:00:00 UTC)).build(&raw, None);
        let payloads = imports(&model, &SeriesIds::with_prefix("x"));

        let json = serde_json::to_value(&payloads[0]).unwrap();
        assert_eq!(json["metadata"]["statistic_id"], "x_last_index");
        assert_eq!(json["metadata"]["has_sum"], true);
        assert_eq!(json["metadata"]["mean_type"], "none");
        assert_eq!(json["statistics"][0]["state"], 7.5);
        assert_eq!(json["statistics"][0]["start"], "2024-01-05T00:00:00Z");
    }
}
