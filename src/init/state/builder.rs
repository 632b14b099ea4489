use std::sync::atomic::AtomicU64;

use tokio::sync::Semaphore;
use tracing::info;

use crate::domain::verification_cache::VerificationCache;
use crate::domain::verifier::DefaultVerifier;
use crate::init::config::VerifierConfig;

use super::server_state::ServerState;

#[derive(Default)]
pub struct ServerStateBuilder {
    app_name_version: Option<String>,
    server_start_time: Option<tokio::time::Instant>,
    verifier_config: Option<VerifierConfig>,
}

impl ServerStateBuilder {
    pub fn app_name_version(mut self, app_name_version: String) -> Self {
        self.app_name_version = Some(app_name_version);
        self
    }

    pub fn server_start_time(mut self, server_start_time: tokio::time::Instant) -> Self {
        self.server_start_time = Some(server_start_time);
        self
    }

    pub fn verifier_config(mut self, verifier_config: VerifierConfig) -> Self {
        self.verifier_config = Some(verifier_config);
        self
    }

    pub fn build(self) -> anyhow::Result<ServerState> {
        let verifier_config = self
            .verifier_config
            .ok_or_else(|| anyhow::anyhow!("verifier_config is required"))?;

        info!(
            smtp_ports = ?verifier_config.smtp_ports,
            max_mx_hosts = %verifier_config.max_mx_hosts,
            permits = %verifier_config.max_concurrent_verifications,
            cache_ttl = ?verifier_config.cache_ttl,
            "Email verifier configured"
        );

        Ok(ServerState {
            app_name_version: self
                .app_name_version
                .ok_or_else(|| anyhow::anyhow!("app_name_version is required"))?,
            server_start_time: self
                .server_start_time
                .ok_or_else(|| anyhow::anyhow!("server_start_time is required"))?,
            responses_handled: AtomicU64::new(0u64),
            verifier: DefaultVerifier::from_config(&verifier_config),
            verification_permits: Semaphore::new(verifier_config.max_concurrent_verifications),
            verification_cache: VerificationCache::new(verifier_config.cache_ttl),
        })
    }
}
