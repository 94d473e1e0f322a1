use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::watch;

use super::ModelPublisher;
use crate::{
    entities,
    model::ConsumptionModel,
    pipeline::{Envelope, PipelineError},
};

pub type LatestModel = watch::Receiver<Option<Arc<ConsumptionModel>>>;

/// Publishes the latest model for readers of entity state.
///
/// The previous model is replaced, never merged. When a snapshot path is
/// set, the derived entity states are also written there as JSON.
pub struct EntityStateSink {
    entry_id: String,
    tx: watch::Sender<Option<Arc<ConsumptionModel>>>,
    snapshot_path: Option<PathBuf>,
}

impl EntityStateSink {
    pub fn new(entry_id: impl Into<String>, snapshot_path: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            entry_id: entry_id.into(),
            tx,
            snapshot_path,
        }
    }

    pub fn subscribe(&self) -> LatestModel {
        self.tx.subscribe()
    }

    async fn write_snapshot(&self, path: &Path, model: &ConsumptionModel) -> Result<(), PipelineError> {
        let states = entities::entity_states(model, &self.entry_id);
        let encoded = serde_json::to_vec_pretty(&states)
            .map_err(|e| PipelineError::Sink(format!("failed to encode entity states: {e}")))?;
        tokio::fs::write(path, encoded)
            .await
            .map_err(|e| PipelineError::Sink(format!("failed to write {}: {e}", path.display())))
    }
}

#[async_trait::async_trait]
impl ModelPublisher for EntityStateSink {
    async fn publish(&self, env: &Envelope<ConsumptionModel>) -> Result<(), PipelineError> {
        let model = Arc::new(env.payload.clone());
        self.tx.send_replace(Some(model.clone()));
        tracing::debug!(
            last_index_m3 = ?model.computed.last_index_m3,
            today_liters = ?model.computed.today_liters,
            "entity state updated"
        );

        if let Some(path) = &self.snapshot_path {
            self.write_snapshot(path, &model).await?;
        }
        Ok(())
    }
}
