use time::{Date, OffsetDateTime};
use water_client::domain::AccountData;

use crate::{
    model::{local_now, ConsumptionModel, ConsumptionModelBuilder},
    pipeline::{Envelope, PipelineError, Transform},
};

/// Build the model for one fetched account snapshot.
///
/// Pure apart from logging: the clock reading is passed in.
pub fn build_model(
    env: Envelope<AccountData>,
    now: OffsetDateTime,
    today: Option<Date>,
) -> Envelope<ConsumptionModel> {
    let builder = ConsumptionModelBuilder::new(now);
    env.map(|raw| builder.build(&raw, today))
}

/// Pipeline stage turning account data into a [`ConsumptionModel`].
#[derive(Clone)]
pub struct ModelBuild {
    clock: fn() -> OffsetDateTime,
}

impl Default for ModelBuild {
    fn default() -> Self {
        Self { clock: local_now }
    }
}

impl ModelBuild {
    pub fn with_clock(clock: fn() -> OffsetDateTime) -> Self {
        Self { clock }
    }
}

#[async_trait::async_trait]
impl Transform<AccountData, ConsumptionModel> for ModelBuild {
    async fn apply(
        &self,
        input: Envelope<AccountData>,
    ) -> Result<Envelope<ConsumptionModel>, PipelineError> {
        let had_daily = !input.payload.daily_consumption.is_empty();
        let env = build_model(input, (self.clock)(), None);

        metrics::counter!("model_builds_total").increment(1);
        let series = &env.payload.computed.series;
        if had_daily && series.is_empty() {
            metrics::counter!("model_series_discarded_total").increment(1);
        }
        metrics::gauge!("model_index_points").set(series.index_m3.len() as f64);

        tracing::info!(
            index_points = series.index_m3.len(),
            daily_points = series.daily_liters.len(),
            monthly_points = series.monthly_m3.len(),
            last_index_m3 = ?env.payload.computed.last_index_m3,
            "consumption model built"
        );
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use water_client::domain::{DailyReading, Measure};

    fn fixed_clock() -> OffsetDateTime {
        datetime!(2024-01-04 00:30:00 +01:00)
    }

    fn account() -> AccountData {
        AccountData {
            daily_consumption: vec![DailyReading {
                date: Some("2024-01-01".to_string()),
                index: Measure { litre: None, m3: Some(10.0) },
                consumption: Measure { litre: Some(25), m3: Some(0.025) },
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn transform_uses_injected_clock() {
        let env = ModelBuild::with_clock(fixed_clock)
            .apply(Envelope::now(account()))
            .await
            .unwrap();

        let points = &env.payload.computed.series.index_m3;
        // 00:30 at +01:00 is still 2024-01-03 in UTC.
        assert_eq!(points.last().unwrap().date(), date!(2024 - 01 - 03));
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn build_model_keeps_receive_time() {
        let input = Envelope::now(account());
        let received_at = input.received_at;
        let out = build_model(input, fixed_clock(), Some(date!(2024 - 01 - 01)));

        assert_eq!(out.received_at, received_at);
        assert_eq!(out.payload.computed.today_liters, Some(25));
    }
}
