use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use anyhow::{Context, Result, bail};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{AccessGate, AppState};
use crate::auth::{JwksValidator, TokenValidator, UnverifiedAssertionValidator};
use crate::config::{AuthConfig, StaticConfig};
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub state: web::Data<AppState>,
    pub gate: AccessGate,
    /// JWKS 后台刷新任务，关闭时中止
    pub background_tasks: Vec<JoinHandle<()>>,
}

/// Build the token validator described by `auth`.
///
/// Returns the validator plus the key-refresh task when one was started.
pub async fn build_validator(
    auth: &AuthConfig,
) -> Result<(Arc<dyn TokenValidator>, Option<JoinHandle<()>>)> {
    if auth.insecure_skip_verify {
        warn!(
            "auth.insecure_skip_verify is enabled: access assertions are decoded but their \
             signatures are NOT verified. Never run this configuration in production."
        );
        return Ok((Arc::new(UnverifiedAssertionValidator::new()), None));
    }

    let Some(endpoint) = auth.certs_endpoint() else {
        bail!(
            "No signing key endpoint configured. Set auth.team_domain or auth.certs_url \
             (or auth.insecure_skip_verify = true for local development)"
        );
    };

    let validator = Arc::new(
        JwksValidator::from_endpoint(&endpoint, auth.audience.clone(), auth.issuer.clone())
            .await
            .context("Failed to load access signing keys")?,
    );
    if auth.audience.as_deref().is_none_or(str::is_empty) {
        warn!("auth.audience is not set; assertions for any application on the team will be accepted");
    }

    let refresh = (auth.jwks_refresh_secs > 0).then(|| {
        debug!("JWKS refresh every {}s", auth.jwks_refresh_secs);
        validator.spawn_refresh(endpoint, Duration::from_secs(auth.jwks_refresh_secs))
    });

    Ok((validator, refresh))
}

/// 准备服务器启动的上下文：存储、认证与共享状态
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let store = StorageFactory::create(&config.storage)
        .await
        .context("Failed to create storage backend")?;

    let (validator, refresh) = build_validator(&config.auth).await?;
    let gate = AccessGate::new(config.auth.assertion_header.clone(), validator);
    info!(
        "Management API protected by '{}' validator (header: {})",
        gate.validator_name(),
        gate.header_name()
    );

    let state = web::Data::new(AppState::new(store));

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        state,
        gate,
        background_tasks: refresh.into_iter().collect(),
    })
}
