use std::sync::Arc;

use crate::auth::TokenSigner;
use crate::clients::mail::Mailer;
use crate::config::Config;
use crate::db::Store;

/// Everything a request handler needs, built once at startup and passed in
/// explicitly. There is no other process-wide state.
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub mailer: Arc<dyn Mailer>,

    pub tokens: TokenSigner,
}

impl SharedState {
    pub async fn new(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = TokenSigner::new(
            &config.auth.token_secret,
            config.auth.access_ttl_minutes,
            config.auth.refresh_ttl_days,
        );

        Ok(Self {
            config,
            store,
            mailer,
            tokens,
        })
    }
}
