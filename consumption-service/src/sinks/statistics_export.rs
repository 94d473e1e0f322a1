use std::{path::PathBuf, time::Duration};

use tokio::io::AsyncWriteExt;

use super::ModelPublisher;
use crate::{
    model::ConsumptionModel,
    pipeline::{Envelope, PipelineError},
    statistics::{self, SeriesIds},
};

/// Appends one NDJSON line per statistics import payload.
///
/// The host's recorder picks the file up and merges rows by timestamp, so
/// re-exporting overlapping windows on every refresh is harmless.
pub struct StatisticsExportSink {
    path: PathBuf,
    ids: SeriesIds,
    max_retries: u32,
    retry_backoff: Duration,
}

impl StatisticsExportSink {
    pub fn new<P: Into<PathBuf>>(path: P, ids: SeriesIds, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            path: path.into(),
            ids,
            max_retries,
            retry_backoff,
        }
    }

    async fn flush(&self, lines: &[u8], payloads: usize) -> Result<(), PipelineError> {
        let mut attempt: u32 = 0;
        loop {
            match self.append(lines).await {
                Ok(()) => {
                    metrics::counter!("statistics_payloads_exported_total").increment(payloads as u64);
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "statistics export failed, retrying with backoff"
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "statistics export failed, giving up");
                    metrics::counter!("statistics_export_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }

    async fn append(&self, lines: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(lines).await?;
        file.flush().await
    }
}

#[async_trait::async_trait]
impl ModelPublisher for StatisticsExportSink {
    async fn publish(&self, env: &Envelope<ConsumptionModel>) -> Result<(), PipelineError> {
        let payloads = statistics::imports(&env.payload, &self.ids);
        if payloads.is_empty() {
            tracing::debug!("no statistics to export for this refresh");
            return Ok(());
        }

        let mut lines = Vec::new();
        for payload in &payloads {
            serde_json::to_writer(&mut lines, payload)
                .map_err(|e| PipelineError::Sink(format!("failed to encode statistics: {e}")))?;
            lines.push(b'\n');
        }

        self.flush(&lines, payloads.len()).await?;
        tracing::info!(
            payloads = payloads.len(),
            path = %self.path.display(),
            "statistics exported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConsumptionModelBuilder;
    use serde_json::Value;
    use time::macros::datetime;
    use water_client::domain::{AccountData, MonthlyReading, Measure};

    fn model() -> ConsumptionModel {
        let raw = AccountData {
            monthly_consumption: vec![MonthlyReading {
                year: Some(2024),
                month: Some(1),
                consumption: Measure { litre: None, m3: Some(10.0) },
                ..Default::default()
            }],
            ..Default::default()
        };
        ConsumptionModelBuilder::new(datetime!(2024-02-01 08:00:00 UTC)).build(&raw, None)
    }

    #[tokio::test]
    async fn each_refresh_appends_payload_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.ndjson");
        let sink = StatisticsExportSink::new(&path, SeriesIds::with_prefix("w"), 0, Duration::ZERO);

        let env = Envelope::now(model());
        sink.publish(&env).await.unwrap();
        sink.publish(&env).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["metadata"]["statistic_id"], "w_monthly_consumption");
        assert_eq!(lines[1]["statistics"][0]["sum"], 10.0);
    }

    #[tokio::test]
    async fn unwritable_path_fails_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("statistics.ndjson");
        let sink = StatisticsExportSink::new(&path, SeriesIds::with_prefix("w"), 2, Duration::from_millis(1));

        let err = sink.publish(&Envelope::now(model())).await.unwrap_err();
        assert!(matches!(err, PipelineError::Sink(_)));
    }
}
