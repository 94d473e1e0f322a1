use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use water_client::domain::{AlertCommand, AlertSettings};

use crate::{
    entities::{self, EntityState},
    model::ConsumptionModel,
    sinks::LatestModel,
    sources::{AlertSettingsWriter, RefreshHandle},
};

#[derive(Clone)]
pub struct ControlState {
    entry_id: Arc<str>,
    latest: LatestModel,
    writer: Arc<dyn AlertSettingsWriter>,
    refresh: RefreshHandle,
}

impl ControlState {
    pub fn new(
        entry_id: &str,
        latest: LatestModel,
        writer: Arc<dyn AlertSettingsWriter>,
        refresh: RefreshHandle,
    ) -> Self {
        Self {
            entry_id: Arc::from(entry_id),
            latest,
            writer,
            refresh,
        }
    }

    fn current(&self) -> Result<Arc<ConsumptionModel>, ControlError> {
        self.latest.borrow().clone().ok_or(ControlError::NotReady)
    }
}

#[derive(thiserror::Error, Debug)]
enum ControlError {
    #[error("no consumption model has been built yet")]
    NotReady,
    #[error(transparent)]
    Invalid(#[from] water_client::domain::AlertSettingsError),
    #[error("failed to update alert settings: {0}")]
    Upstream(String),
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotReady => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/entities", get(get_entities))
        .route("/alerts", get(get_alerts).post(post_alert))
        .with_state(state)
}

/// Serve the control API in the background.
pub async fn serve(bind_addr: &str, app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid control bind address '{bind_addr}': {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "control endpoint listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(error = %e, "control server error");
        }
    });
    Ok(())
}

async fn get_entities(State(state): State<ControlState>) -> Result<Json<Vec<EntityState>>, ControlError> {
    let model = state.current()?;
    Ok(Json(entities::entity_states(&model, &state.entry_id)))
}

async fn get_alerts(State(state): State<ControlState>) -> Result<Json<AlertSettings>, ControlError> {
    let model = state.current()?;
    Ok(Json(model.alert_settings.clone()))
}

async fn post_alert(
    State(state): State<ControlState>,
    Json(command): Json<AlertCommand>,
) -> Result<Json<AlertSettings>, ControlError> {
    metrics::counter!("alert_commands_total").increment(1);

    let mut settings = state.current()?.alert_settings.clone();
    settings.apply(&command).map_err(|e| {
        metrics::counter!("alert_commands_rejected_total").increment(1);
        tracing::warn!(error = %e, ?command, "alert command rejected");
        e
    })?;

    state
        .writer
        .write_alert_settings(&settings)
        .await
        .map_err(|e| ControlError::Upstream(e.to_string()))?;

    tracing::info!(?command, "alert settings updated");
    state.refresh.request_refresh();
    Ok(Json(settings))
}
