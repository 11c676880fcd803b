pub mod auth;
pub mod blob;
pub mod board;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use actix_web::web;

use crate::auth::TokenVerifier;
use crate::blob::BlobStore;
use crate::config::{Config, ConfigError};
use crate::routes::webhooks::webhooks_signature::WebhookVerifier;
use crate::store::TaskHubStore;

/// Shared state handed to every worker's `App`.
#[derive(Clone)]
pub struct AppData {
    pub store: web::Data<dyn TaskHubStore>,
    pub tokens: web::Data<TokenVerifier>,
    pub blobs: web::Data<BlobStore>,
    pub webhooks: web::Data<WebhookVerifier>,
}

impl AppData {
    pub fn new(
        store: Arc<dyn TaskHubStore>,
        tokens: TokenVerifier,
        blobs: BlobStore,
        webhooks: WebhookVerifier,
    ) -> Self {
        Self {
            store: web::Data::from(store),
            tokens: web::Data::new(tokens),
            blobs: web::Data::new(blobs),
            webhooks: web::Data::new(webhooks),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn TaskHubStore>) -> Result<Self, ConfigError> {
        let tokens = TokenVerifier::new(&config.jwt_key, config.jwt_audience.as_deref())?;
        let webhooks = WebhookVerifier::new(&config.webhook_secret)?;
        Ok(Self::new(store, tokens, BlobStore::new(config.upload_dir.clone()), webhooks))
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.store.clone())
            .app_data(self.tokens.clone())
            .app_data(self.blobs.clone())
            .app_data(self.webhooks.clone());
    }

    /// Registers the shared state, the `/api` surface, stored files and the
    /// root greeting.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        self.register(cfg);
        cfg.route("/", web::get().to(routes::routes::root_get))
            .configure(routes::routes::api_configure)
            .configure(routes::routes::files_configure);
    }
}
