use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::chat::ChatStore;
use crate::credits::CreditLedger;
use crate::jobs::dispatch::Dispatcher;
use crate::jobs::executor::Executor;
use crate::jobs::JobStore;
use crate::llm_client::TextGenerator;
use crate::storage::FileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub credits: Arc<dyn CreditLedger>,
    pub jobs: Arc<dyn JobStore>,
    pub chats: Arc<dyn ChatStore>,
    pub llm: Arc<dyn TextGenerator>,
    pub files: Arc<dyn FileStore>,
    /// Local spawn or Inngest, chosen by DISPATCH_MODE.
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Runs events delivered to the executor callback.
    pub executor: Arc<Executor>,
    /// `None` when CLERK_JWT_KEY is unset; callers then identify by `userId`.
    pub auth: Option<Arc<JwtVerifier>>,
    pub executor_secret: Option<String>,
}
