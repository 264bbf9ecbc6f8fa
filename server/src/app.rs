//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{ApiServer, AuthManager};
use crate::broker::{Broker, BrokerError};
use crate::core::cli::{self, CliConfig};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, RETRY_BASE_DELAY_SECS, RETRY_TIMES};
use crate::core::shutdown::ShutdownService;
use crate::data::FileStore;
use crate::schemas::SchemaRegistry;
use crate::utils::retry::retry_with_backoff;
use crate::workers::{AccessionHandler, MapperHandler, Worker};

pub struct CoreApp {
    pub config: AppConfig,
    pub store: Arc<FileStore>,
    pub broker: Arc<Broker>,
    pub schemas: Arc<SchemaRegistry>,
    pub auth: Arc<AuthManager>,
    pub shutdown: ShutdownService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        Self::start(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let schemas = Arc::new(
            SchemaRegistry::load(&config.broker.schemas_path)
                .context("failed to load message schemas")?,
        );

        let store = Arc::new(
            FileStore::init(&config.db)
                .await
                .context("failed to initialize the file store")?,
        );
        tracing::debug!(version = store.schema_version(), "File store initialized");

        // The broker may come up after us; give it the usual backoff window.
        let broker = Arc::new(
            retry_with_backoff(
                RETRY_TIMES,
                std::time::Duration::from_secs(RETRY_BASE_DELAY_SECS),
                || Broker::connect(config.broker.clone(), schemas.clone()),
                BrokerError::is_schema_violation,
            )
            .await
            .context("failed to connect to the broker")?,
        );

        let auth = Arc::new(AuthManager::from_config(&config.api)?);
        let shutdown = ShutdownService::new(broker.clone(), store.clone());

        Ok(Self {
            config,
            store,
            broker,
            schemas,
            auth,
            shutdown,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        if app.config.workers.enabled {
            app.start_workers().await;
        } else {
            tracing::debug!("Workers disabled, serving the admin API only");
        }

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    /// Spawn the mapper and accession consumers, registered for drain at
    /// shutdown.
    async fn start_workers(&self) {
        let mapper = Worker::new(
            self.broker.clone(),
            self.store.clone(),
            self.schemas.clone(),
            self.config.workers.mappings_queue.clone(),
        );
        self.shutdown
            .register(mapper.spawn(
                Arc::new(MapperHandler::new(self.store.clone())),
                self.shutdown.subscribe(),
            ))
            .await;

        let accession = Worker::new(
            self.broker.clone(),
            self.store.clone(),
            self.schemas.clone(),
            self.config.workers.accession_queue.clone(),
        );
        self.shutdown
            .register(accession.spawn(
                Arc::new(AccessionHandler::new(self.store.clone())),
                self.shutdown.subscribe(),
            ))
            .await;

        tracing::debug!("Workers started");
    }
}
