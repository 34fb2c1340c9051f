//! Main application logic.
//!
//! Startup order: symbol list, REST pollers, one-shot news fetch, selection
//! controller (seeded with the default symbol), dashboard server. Everything
//! runs until the shutdown token fires, then is awaited in turn.

use std::sync::Arc;

use bitdash_dashboard::{run_server, DashboardState};
use bitdash_feed::{MarketDataClient, MarketState, SelectionController};
use bitdash_rest::NewsFetcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Pending selection requests.
const SELECTION_QUEUE: usize = 16;

/// Main application.
pub struct Application {
    config: AppConfig,
    state: Arc<MarketState>,
    client: Arc<MarketDataClient>,
    news: Arc<NewsFetcher>,
}

impl Application {
    /// Create a new application instance.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = MarketDataClient::new(config.market.clone(), config.stream.clone())?;
        let news = NewsFetcher::new(config.news.clone())?;

        Ok(Self {
            config,
            state: Arc::new(MarketState::new()),
            client: Arc::new(client),
            news: Arc::new(news),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<MarketState> {
        &self.state
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let shutdown = CancellationToken::new();

        let signal = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    signal.cancel();
                }
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
        });

        self.run_until(shutdown).await
    }

    /// Run until `shutdown` fires.
    pub async fn run_until(self, shutdown: CancellationToken) -> AppResult<()> {
        let symbols = self.client.list_symbols().await;
        self.state.set_symbols(symbols);

        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        let (client, state, cancel) = (self.client.clone(), self.state.clone(), shutdown.clone());
        tasks.push((
            "ticker_sync",
            tokio::spawn(async move { client.sync_tickers(state, cancel).await }),
        ));

        let (client, state, cancel) = (self.client.clone(), self.state.clone(), shutdown.clone());
        tasks.push((
            "futures_sync",
            tokio::spawn(async move { client.sync_futures(state, cancel).await }),
        ));

        let (news, state, cancel) = (self.news.clone(), self.state.clone(), shutdown.clone());
        tasks.push((
            "news",
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    items = news.fetch() => state.set_news(items),
                }
            }),
        ));

        let (selection_tx, selection_rx) = mpsc::channel(SELECTION_QUEUE);
        selection_tx
            .send(self.config.market.default_symbol.clone())
            .await
            .map_err(|_| AppError::Config("selection queue closed".to_string()))?;
        let controller = SelectionController::new(self.client.clone(), self.state.clone());
        tasks.push((
            "selection",
            tokio::spawn(controller.run(selection_rx, shutdown.clone())),
        ));

        let server = if self.config.dashboard.enabled {
            let dashboard = DashboardState::new(
                self.state.clone(),
                selection_tx.clone(),
                self.news.clone(),
                self.config.market.contract_suffix.as_str(),
            );
            let config = self.config.dashboard.clone();
            let server_shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                let result = run_server(dashboard, config, server_shutdown.clone()).await;
                if result.is_err() {
                    server_shutdown.cancel();
                }
                result.map_err(|e| e.to_string())
            }))
        } else {
            info!("Dashboard disabled");
            None
        };

        info!(symbol = %self.config.market.default_symbol, "Running");
        shutdown.cancelled().await;
        info!("Shutting down");
        drop(selection_tx);

        for (name, task) in tasks {
            match task.await {
                Ok(()) => debug!(task = name, "Task stopped"),
                Err(e) => warn!(task = name, error = %e, "Task failed"),
            }
        }

        if let Some(server) = server {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(AppError::Dashboard(e)),
                Err(e) => return Err(AppError::Dashboard(e.to_string())),
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}
