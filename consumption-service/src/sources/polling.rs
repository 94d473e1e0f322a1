use std::{pin::Pin, sync::Arc, time::Duration};

use futures::Stream;
use time::{Date, Month};
use tokio::{
    sync::{mpsc, Mutex},
    time::MissedTickBehavior,
};
use water_client::domain::AccountData;

use super::AccountFetcher;
use crate::pipeline::{Envelope, PipelineError, Source};

/// History requested from the utility: `start` inclusive, both on the 1st of
/// a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: Date,
    pub end: Date,
}

impl FetchWindow {
    /// Window ending on the 1st of `today`'s month and starting `months`
    /// earlier.
    pub fn months_back(today: Date, months: u32) -> Self {
        let end = today.replace_day(1).unwrap_or(today);
        let start = shift_months_back(end, months).unwrap_or(end);
        Self { start, end }
    }
}

fn shift_months_back(first_of_month: Date, months: u32) -> Option<Date> {
    let index = first_of_month.year() * 12 + i32::from(u8::from(first_of_month.month())) - 1
        - i32::try_from(months).ok()?;
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
    Date::from_calendar_date(index.div_euclid(12), month, 1).ok()
}

/// A wide backfill on the first successful fetch, a short rolling window
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub initial_lookback_months: u32,
    pub periodic_lookback_months: u32,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            initial_lookback_months: 12,
            periodic_lookback_months: 1,
        }
    }
}

impl WindowPolicy {
    pub fn window(&self, today: Date, backfilled: bool) -> FetchWindow {
        let months = if backfilled {
            self.periodic_lookback_months
        } else {
            self.initial_lookback_months
        };
        FetchWindow::months_back(today, months)
    }
}

/// Requests an out-of-schedule refresh, e.g. after an alert setting changed.
///
/// Requests made while one is already pending collapse into it.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// A handle plus the receiving end a scheduler listens on.
    pub fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    pub fn request_refresh(&self) {
        if self.tx.try_send(()).is_ok() {
            tracing::debug!("on-demand refresh requested");
        }
    }
}

/// Polls an [`AccountFetcher`] on a fixed interval and on demand.
///
/// The first tick fires immediately. Fetches never overlap: the next one
/// starts only after the previous envelope was consumed downstream.
pub struct PollingSource<F> {
    fetcher: Arc<F>,
    interval: Duration,
    policy: WindowPolicy,
    refresh: RefreshHandle,
    requests: Arc<Mutex<Option<mpsc::Receiver<()>>>>,
    today: fn() -> Date,
}

impl<F> PollingSource<F>
where
    F: AccountFetcher + 'static,
{
    pub fn new(fetcher: F, interval: Duration, policy: WindowPolicy) -> Self {
        let (refresh, rx) = RefreshHandle::channel();
        Self {
            fetcher: Arc::new(fetcher),
            interval,
            policy,
            refresh,
            requests: Arc::new(Mutex::new(Some(rx))),
            today: local_today,
        }
    }

    /// Override the date used to place fetch windows.
    pub fn with_today(mut self, today: fn() -> Date) -> Self {
        self.today = today;
        self
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }
}

pub fn local_today() -> Date {
    crate::model::local_now().date()
}

#[async_trait::async_trait]
impl<F> Source<AccountData> for PollingSource<F>
where
    F: AccountFetcher + 'static,
{
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<AccountData>, PipelineError>> + Send>> {
        let requests = self.requests.lock().await.take();
        let fetcher = self.fetcher.clone();
        let interval = self.interval;
        let policy = self.policy;
        let today = self.today;
        // Keeps the request channel open for as long as the stream lives.
        let _refresh = self.refresh.clone();

        let s = async_stream::stream! {
            let _refresh = _refresh;
            let Some(mut requests) = requests else {
                yield Err(PipelineError::Source("polling source stream already taken".to_string()));
                return;
            };

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut backfilled = false;

            loop {
                let trigger = tokio::select! {
                    _ = ticker.tick() => "schedule",
                    Some(()) = requests.recv() => "on_demand",
                };

                let window = policy.window(today(), backfilled);
                tracing::info!(
                    trigger,
                    start = %window.start,
                    end = %window.end,
                    backfill = !backfilled,
                    "fetching account data"
                );

                match fetcher.fetch(window).await {
                    Ok(data) => {
                        backfilled = true;
                        metrics::counter!("account_fetches_total").increment(1);
                        yield Ok(Envelope::now(data));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, trigger, "account fetch failed, skipping this refresh");
                        metrics::counter!("account_fetch_failures_total").increment(1);
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(s)
    }
}
