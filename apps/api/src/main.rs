use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mentorly::auth::JwtVerifier;
use mentorly::config::{Config, DispatchMode};
use mentorly::db::create_pool;
use mentorly::jobs::dispatch::{Dispatcher, InngestDispatcher, LocalDispatcher};
use mentorly::jobs::executor::Executor;
use mentorly::llm_client::{self, GeminiClient};
use mentorly::notify::{NoopNotifier, Notifier, OneSignalNotifier};
use mentorly::repository::PgRepository;
use mentorly::routes::build_router;
use mentorly::state::AppState;
use mentorly::storage::S3FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mentorly API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let repo = Arc::new(PgRepository::new(db));

    // Initialize S3 / MinIO
    let files = Arc::new(S3FileStore::from_config(&config).await);
    info!("S3 file store initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = Arc::new(GeminiClient::new(config.gemini_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let notifier: Arc<dyn Notifier> = match &config.onesignal {
        Some(onesignal) => {
            info!("OneSignal push notifications enabled");
            Arc::new(OneSignalNotifier::new(
                onesignal.app_id.clone(),
                onesignal.rest_api_key.clone(),
                config.app_url.clone(),
            ))
        }
        None => Arc::new(NoopNotifier),
    };

    let auth = match &config.auth {
        Some(auth_config) => Some(Arc::new(JwtVerifier::from_config(auth_config)?)),
        None => {
            info!("CLERK_JWT_KEY not set; trusting userId from requests");
            None
        }
    };

    let executor = Arc::new(Executor::new(
        repo.clone(),
        llm.clone(),
        notifier,
        config.app_url.clone(),
    ));

    let dispatcher: Arc<dyn Dispatcher> = match &config.dispatch {
        DispatchMode::Local => {
            info!("Dispatching jobs to the in-process executor");
            Arc::new(LocalDispatcher::new(executor.clone()))
        }
        DispatchMode::Inngest {
            base_url,
            event_key,
        } => {
            info!("Dispatching jobs to Inngest at {base_url}");
            Arc::new(InngestDispatcher::new(base_url, event_key)?)
        }
    };

    // Build app state
    let state = AppState {
        credits: repo.clone(),
        jobs: repo.clone(),
        chats: repo,
        llm,
        files,
        dispatcher,
        executor,
        auth,
        executor_secret: config.executor_secret.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to APP_URL once the frontend is served from one domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
