use serde_derive::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Mailbox accepted by a server that rejects random mailboxes.
    Valid,
    /// Mailbox accepted, but so is anything else on the domain.
    Risky,
    Invalid,
}

/// Outcome of one address check. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationResult {
    pub email: String,
    pub syntax: bool,
    pub mx: bool,
    pub smtp_accepts: bool,
    pub catch_all: bool,
    pub status: VerificationStatus,
}

impl VerificationResult {
    pub fn new(email: &str) -> Self {
        VerificationResult {
            email: email.to_owned(),
            syntax: false,
            mx: false,
            smtp_accepts: false,
            catch_all: false,
            status: VerificationStatus::Invalid,
        }
    }

    /// Sets the final status from the flags gathered so far.
    pub fn conclude(mut self) -> Self {
        self.status = match (self.syntax && self.mx && self.smtp_accepts, self.catch_all) {
            (true, true) => VerificationStatus::Risky,
            (true, false) => VerificationStatus::Valid,
            (false, _) => VerificationStatus::Invalid,
        };
        self
    }
}
