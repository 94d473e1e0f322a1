pub mod entity_state;
pub mod statistics_export;

pub use entity_state::{EntityStateSink, LatestModel};
pub use statistics_export::StatisticsExportSink;

use futures::{Stream, StreamExt};

use crate::{
    model::ConsumptionModel,
    pipeline::{Envelope, PipelineError, Sink},
};

/// Receives each freshly built model.
#[async_trait::async_trait]
pub trait ModelPublisher: Send + Sync {
    async fn publish(&self, env: &Envelope<ConsumptionModel>) -> Result<(), PipelineError>;
}

/// Hands every model to its publishers in order.
///
/// Upstream errors (a failed fetch) are logged and skipped; the previous
/// model stays published until the next successful refresh.
pub struct FanoutSink {
    publishers: Vec<Box<dyn ModelPublisher>>,
}

impl FanoutSink {
    pub fn new(publishers: Vec<Box<dyn ModelPublisher>>) -> Self {
        Self { publishers }
    }
}

#[async_trait::async_trait]
impl Sink<ConsumptionModel> for FanoutSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<ConsumptionModel>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "refresh failed upstream, keeping previous model");
                    continue;
                }
            };

            for publisher in &self.publishers {
                publisher.publish(&env).await?;
            }

            if let Ok(latency) = std::time::SystemTime::now().duration_since(env.received_at) {
                metrics::histogram!("refresh_publish_latency_seconds").record(latency.as_secs_f64());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<Option<f64>>>>);

    #[async_trait::async_trait]
    impl ModelPublisher for Recorder {
        async fn publish(&self, env: &Envelope<ConsumptionModel>) -> Result<(), PipelineError> {
            self.0.lock().unwrap().push(env.payload.computed.last_index_m3);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl ModelPublisher for Failing {
        async fn publish(&self, _env: &Envelope<ConsumptionModel>) -> Result<(), PipelineError> {
            Err(PipelineError::Sink("disk full".to_string()))
        }
    }

    fn model(index: f64) -> Result<Envelope<ConsumptionModel>, PipelineError> {
        let mut model = ConsumptionModel::default();
        model.computed.last_index_m3 = Some(index);
        Ok(Envelope::now(model))
    }

    #[tokio::test]
    async fn upstream_errors_are_skipped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publishers: Vec<Box<dyn ModelPublisher>> = vec![Box::new(Recorder(seen.clone()))];
        let sink = FanoutSink::new(publishers);
        let input = futures::stream::iter(vec![
            model(1.0),
            Err(PipelineError::Source("offline".to_string())),
            model(2.0),
        ]);

        sink.run(input).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Some(1.0), Some(2.0)]);
    }

    #[tokio::test]
    async fn publisher_failure_stops_the_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publishers: Vec<Box<dyn ModelPublisher>> = vec![Box::new(Recorder(seen.clone())), Box::new(Failing)];
        let sink = FanoutSink::new(publishers);
        let input = futures::stream::iter(vec![model(1.0), model(2.0)]);

        assert!(sink.run(input).await.is_err());
        assert_eq!(*seen.lock().unwrap(), vec![Some(1.0)]);
    }
}
