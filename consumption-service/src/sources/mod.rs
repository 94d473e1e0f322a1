pub mod account_file;
pub mod polling;

pub use account_file::AccountFileFetcher;
pub use polling::{FetchWindow, PollingSource, RefreshHandle, WindowPolicy};

use water_client::domain::{AccountData, AlertSettings};

use crate::pipeline::PipelineError;

/// Retrieves account data for a history window.
///
/// Authentication and connectivity failures surface as
/// [`PipelineError::Source`] and abort the refresh cycle.
#[async_trait::async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn fetch(&self, window: FetchWindow) -> Result<AccountData, PipelineError>;
}

/// Pushes updated alert settings back to the account.
#[async_trait::async_trait]
pub trait AlertSettingsWriter: Send + Sync {
    async fn write_alert_settings(&self, settings: &AlertSettings) -> Result<(), PipelineError>;
}
