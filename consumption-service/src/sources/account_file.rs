use std::path::PathBuf;

use serde_json::Value;
use water_client::domain::{AccountData, AlertSettings};

use super::{AccountFetcher, AlertSettingsWriter, FetchWindow};
use crate::pipeline::PipelineError;

/// Account data read from a JSON document on disk.
///
/// The document has the provider's shape (`id_abonnement`,
/// `daily_consumption`, `monthly_consumption`, `alert_settings`). Readings
/// older than the requested window are left out, mirroring what a windowed
/// API call returns; undated readings are passed through for the model
/// builder to skip.
#[derive(Debug, Clone)]
pub struct AccountFileFetcher {
    path: PathBuf,
}

impl AccountFileFetcher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    async fn read_document(&self) -> Result<Value, PipelineError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PipelineError::Source(format!("failed to read account file {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| PipelineError::Source(format!("failed to parse account file: {e}")))
    }
}

#[async_trait::async_trait]
impl AccountFetcher for AccountFileFetcher {
    async fn fetch(&self, window: FetchWindow) -> Result<AccountData, PipelineError> {
        let document = self.read_document().await?;
        let mut data: AccountData = serde_json::from_value(document)
            .map_err(|e| PipelineError::Source(format!("unexpected account document: {e}")))?;

        let before = data.daily_consumption.len() + data.monthly_consumption.len();
        data.daily_consumption
            .retain(|r| r.reading_date().map_or(true, |d| d >= window.start));
        data.monthly_consumption
            .retain(|r| r.period_start().map_or(true, |d| d >= window.start));
        let after = data.daily_consumption.len() + data.monthly_consumption.len();

        tracing::debug!(
            path = %self.path.display(),
            readings = after,
            outside_window = before - after,
            "loaded account file"
        );
        Ok(data)
    }
}

#[async_trait::async_trait]
impl AlertSettingsWriter for AccountFileFetcher {
    async fn write_alert_settings(&self, settings: &AlertSettings) -> Result<(), PipelineError> {
        let mut document = self.read_document().await?;
        let Value::Object(fields) = &mut document else {
            return Err(PipelineError::Sink("account file is not a JSON object".to_string()));
        };
        let settings = serde_json::to_value(settings)
            .map_err(|e| PipelineError::Sink(format!("failed to encode alert settings: {e}")))?;
        fields.insert("alert_settings".to_string(), settings);

        let encoded = serde_json::to_vec_pretty(&document)
            .map_err(|e| PipelineError::Sink(format!("failed to encode account file: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to replace account file: {e}")))?;

        tracing::info!(path = %self.path.display(), "alert settings written");
        Ok(())
    }
}
