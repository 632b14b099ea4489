use std::time::Duration;

use chrono::{DateTime, Utc};

use super::verification::VerificationResult;

#[derive(Debug, Clone)]
pub struct CachedVerification {
    pub result: VerificationResult,
    pub expires_at: DateTime<Utc>,
}

/// Short-lived memo of finished verifications so a burst of identical requests does not
/// hammer the same remote mail server. Keys are lower-cased addresses.
pub struct VerificationCache {
    entries: scc::HashMap<String, CachedVerification>,
    ttl: Option<chrono::Duration>,
}

impl VerificationCache {
    pub fn new(ttl: Duration) -> Self {
        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(ttl) if ttl > chrono::Duration::zero() => Some(ttl),
            _ => None,
        };

        VerificationCache {
            entries: scc::HashMap::new(),
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    fn key(email: &str) -> String {
        email.to_lowercase()
    }

    /// Cached result re-labelled with the caller's spelling of the address.
    pub async fn get(&self, email: &str) -> Option<VerificationResult> {
        if self.ttl.is_none() {
            return None;
        }

        let now = Utc::now();
        let cached = self
            .entries
            .read_async(&Self::key(email), |_, v| v.clone())
            .await?;

        if cached.expires_at <= now {
            return None;
        }

        let mut result = cached.result;
        result.email = email.to_owned();
        Some(result)
    }

    pub async fn insert(&self, result: &VerificationResult) {
        let Some(ttl) = self.ttl else {
            return;
        };

        let key = Self::key(&result.email);
        let entry = CachedVerification {
            result: result.clone(),
            expires_at: Utc::now() + ttl,
        };

        if self
            .entries
            .update_async(&key, |_, cached| {
                *cached = entry.clone();
            })
            .await
            .is_none()
        {
            let _ = self.entries.insert_async(key, entry).await;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops expired entries; returns `(pruned, remaining)`.
    pub async fn purge_expired(&self) -> (usize, usize) {
        let now = Utc::now();
        let (mut pruned, mut remaining): (usize, usize) = (0, 0);

        self.entries
            .iter_mut_async(|entry| {
                if entry.expires_at <= now {
                    pruned += 1;
                    let _ = entry.consume();
                } else {
                    remaining += 1;
                }
                true
            })
            .await;

        (pruned, remaining)
    }
}
