use crate::config::{Config, StorageBackend};
use anyhow::Result;
use std::sync::Arc;
use teammatch_channel::{CommandRouter, TelegramService};
use teammatch_core::{MatchService, ServiceSettings};
use teammatch_logging::LogFormat;
use teammatch_persistence::{
    InMemoryProfileStore, InMemorySessionStore, ProfileStore, SqliteProfileStore,
};

use tokio::signal;
use tracing::{error, info, warn};

/// Gateway service - wires stores, core and channel together
pub struct GatewayService {
    config: Config,
}

impl GatewayService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn profile_store(&self) -> Result<Arc<dyn ProfileStore>> {
        let store: Arc<dyn ProfileStore> = match self.config.database.backend {
            StorageBackend::Sqlite => {
                let store = SqliteProfileStore::new(&self.config.database.path).await?;
                info!("SQLite profile store opened at {}", self.config.database.path);
                Arc::new(store)
            }
            StorageBackend::Memory => {
                warn!("Using the in-memory profile store; profiles are lost on restart");
                Arc::new(InMemoryProfileStore::new())
            }
        };
        Ok(store)
    }

    /// Run the gateway service
    pub async fn run(self) -> Result<()> {
        teammatch_logging::init_logging(
            &self.config.logging.level,
            LogFormat::from_config(&self.config.logging.format),
        )?;
        info!("Starting TeamMatch Gateway Service");

        let matching = &self.config.matching;
        info!(
            "Matching config: store_timeout={}s, session_ttl={}s, max_listed_candidates={}",
            matching.store_timeout_secs, matching.session_ttl_secs, matching.max_listed_candidates
        );

        let profiles = self.profile_store().await?;
        // Registration progress is ephemeral; an unfinished questionnaire restarts after a restart
        let sessions = Arc::new(InMemorySessionStore::new());

        let settings = ServiceSettings {
            store_timeout: matching.store_timeout(),
            session_ttl: matching.session_ttl(),
        };
        let service = Arc::new(MatchService::new(profiles, sessions, settings));

        let router = CommandRouter::new(service, matching.max_listed_candidates);
        let telegram_service = TelegramService::new(&self.config.telegram.bot_token, router);

        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
            info!("Received shutdown signal");
        };

        tokio::select! {
            result = telegram_service.run() => {
                if let Err(e) = result {
                    error!("Telegram service error: {}", e);
                    return Err(e);
                }
            }
            _ = shutdown => {
                info!("Shutting down gracefully...");
            }
        }

        info!("Gateway service stopped");
        Ok(())
    }
}
