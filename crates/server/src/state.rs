//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::email::{MailError, ResendMailer};
use crate::services::push::{PushError, VapidPushSender};

/// Error building the outbound clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email client: {0}")]
    Mail(#[from] MailError),
    #[error("push client: {0}")]
    Push(#[from] PushError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    mailer: ResendMailer,
    push: Option<Arc<VapidPushSender>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The push sender is only built when VAPID keys are configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound client cannot be created.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = ResendMailer::new(&config.email)?;
        let push = config
            .push
            .as_ref()
            .map(VapidPushSender::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mailer,
                push,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the transactional mailer.
    #[must_use]
    pub fn mailer(&self) -> &ResendMailer {
        &self.inner.mailer
    }

    /// The push sender, if VAPID keys are configured.
    #[must_use]
    pub fn push_sender(&self) -> Option<&Arc<VapidPushSender>> {
        self.inner.push.as_ref()
    }
}
