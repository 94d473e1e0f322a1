use anyhow::Result;
use consumption_service::{
    config::AppConfig,
    http_control::{self, ControlState},
    metrics_server,
    model::ConsumptionModel,
    observability,
    pipeline::Pipeline,
    sinks::{EntityStateSink, FanoutSink, ModelPublisher, StatisticsExportSink},
    sources::{AccountFileFetcher, PollingSource},
    statistics::SeriesIds,
    transform::ModelBuild,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use water_client::domain::AccountData;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let fetcher = AccountFileFetcher::new(&cfg.source.account_file);
    let source = PollingSource::new(fetcher.clone(), cfg.refresh.interval(), cfg.refresh.window_policy());

    let entity_sink = EntityStateSink::new(&cfg.entry_id, cfg.entities.snapshot_path.as_ref().map(PathBuf::from));
    let latest = entity_sink.subscribe();

    if let Some(control_cfg) = &cfg.control {
        let state = ControlState::new(&cfg.entry_id, latest, Arc::new(fetcher), source.refresh_handle());
        http_control::serve(&control_cfg.bind_addr, http_control::router(state)).await?;
    }

    let statistics_sink = StatisticsExportSink::new(
        &cfg.statistics.output_path,
        SeriesIds::with_prefix(&cfg.statistic_prefix()),
        cfg.statistics.max_retries,
        Duration::from_millis(cfg.statistics.retry_backoff_ms),
    );

    let publishers: Vec<Box<dyn ModelPublisher>> = vec![Box::new(entity_sink), Box::new(statistics_sink)];

    tracing::info!(
        entry_id = %cfg.entry_id,
        interval_hours = cfg.refresh.interval_hours,
        "consumption service starting"
    );

    let pipeline: Pipeline<_, AccountData, ConsumptionModel, _> = Pipeline {
        source,
        transform: Arc::new(ModelBuild::default()),
        sink: FanoutSink::new(publishers),
    };

    pipeline.run().await?;

    Ok(())
}
