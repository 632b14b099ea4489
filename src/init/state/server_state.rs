use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::verification::VerificationResult;
use crate::domain::verification_cache::VerificationCache;
use crate::domain::verifier::DefaultVerifier;

use super::builder::ServerStateBuilder;

pub struct ServerState {
    pub(crate) app_name_version: String,
    pub(crate) server_start_time: tokio::time::Instant,
    pub(crate) responses_handled: AtomicU64,
    pub(crate) verifier: DefaultVerifier,
    pub(crate) verification_permits: Semaphore, // bounds concurrent SMTP sessions
    pub(crate) verification_cache: VerificationCache, // read/write
}

impl ServerState {
    pub fn builder() -> ServerStateBuilder {
        ServerStateBuilder::default()
    }

    pub fn get_app_name_version(&self) -> String {
        self.app_name_version.clone()
    }

    pub fn get_uptime(&self) -> tokio::time::Duration {
        self.server_start_time.elapsed()
    }

    pub fn get_responses_handled(&self) -> u64 {
        self.responses_handled.load(Ordering::SeqCst)
    }

    pub fn add_responses_handled(&self) {
        self.responses_handled.fetch_add(1, Ordering::SeqCst);
    }

    /// Runs the full pipeline under a concurrency permit, consulting the cache first.
    pub async fn verify_email(&self, email: &str) -> anyhow::Result<VerificationResult> {
        if let Some(cached) = self.verification_cache.get(email).await {
            debug!(email = %email, status = ?cached.status, "Verification served from cache");
            return Ok(cached);
        }

        let permit = self
            .verification_permits
            .acquire()
            .await
            .map_err(|e| anyhow::anyhow!("Verification permits closed: {e}"))?;

        let result = self.verifier.verify(email).await;
        drop(permit);

        // Syntax failures are cheap to recompute and never touch the network.
        if result.syntax {
            self.verification_cache.insert(&result).await;
        }

        Ok(result)
    }

    pub async fn purge_verification_cache(&self) -> (usize, usize) {
        self.verification_cache.purge_expired().await
    }

    pub fn get_verification_cache_len(&self) -> usize {
        self.verification_cache.len()
    }

    /// Stops accepting new verifications; waiters fail instead of blocking shutdown.
    pub fn close_verifications(&self) {
        self.verification_permits.close();
    }
}
