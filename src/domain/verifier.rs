use tracing::{debug, info};

use crate::domain::verification::VerificationResult;
use crate::init::config::VerifierConfig;
use crate::util::dns::mx_lookup::{DnsMxResolver, MxResolver};
use crate::util::email::random_mailbox::generate_random_mailbox;
use crate::util::email::syntax::{email_domain, validate_email_syntax};
use crate::util::smtp::probe::{MailboxProbe, SmtpProber};

pub type DefaultVerifier = EmailVerifier<DnsMxResolver, SmtpProber>;

/// Syntax, DNS, SMTP and catch-all checks, in that order, stopping at the first failure.
pub struct EmailVerifier<R, P> {
    resolver: R,
    prober: P,
    max_mx_hosts: usize,
}

impl DefaultVerifier {
    pub fn from_config(config: &VerifierConfig) -> Self {
        EmailVerifier::new(
            DnsMxResolver::new(config.dns_timeout),
            SmtpProber::new(config),
            config.max_mx_hosts,
        )
    }
}

impl<R: MxResolver, P: MailboxProbe> EmailVerifier<R, P> {
    pub fn new(resolver: R, prober: P, max_mx_hosts: usize) -> Self {
        EmailVerifier {
            resolver,
            prober,
            max_mx_hosts: max_mx_hosts.max(1),
        }
    }

    pub async fn verify(&self, email: &str) -> VerificationResult {
        let mut result = VerificationResult::new(email);

        if !validate_email_syntax(email) {
            return result;
        }
        result.syntax = true;

        let Some(domain) = email_domain(email) else {
            return result;
        };

        let exchangers = self.resolver.lookup(domain).await;
        if exchangers.hosts.is_empty() {
            debug!(domain = %domain, "Domain has no mail hosts");
            return result;
        }
        result.mx = true;

        let mut last_message = String::from("No MX hosts available");
        for mx_host in exchangers.hosts.iter().take(self.max_mx_hosts) {
            let outcome = self.prober.probe(mx_host, email).await;
            if outcome.accepted {
                result.smtp_accepts = true;
                break;
            }
            last_message = outcome.message;
        }

        if !result.smtp_accepts {
            info!(domain = %domain, reason = %last_message, "Mailbox not accepted");
            return result.conclude();
        }

        result.catch_all = self.is_catch_all(domain, &exchangers.hosts).await;
        result.conclude()
    }

    /// A domain that accepts a random mailbox accepts everything.
    async fn is_catch_all(&self, domain: &str, hosts: &[String]) -> bool {
        let Some(first_host) = hosts.first() else {
            return false;
        };

        let probe_address = generate_random_mailbox(domain);
        let outcome = self.prober.probe(first_host, &probe_address).await;
        debug!(domain = %domain, accepted = outcome.accepted, "Catch-all probe finished");
        outcome.accepted
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::verification::VerificationStatus;
    use crate::util::dns::mx_lookup::MailExchangers;
    use crate::util::smtp::probe::ProbeOutcome;
    use crate::util::smtp::probe::tests::{prober_for, spawn_fake_smtp};

    struct FakeResolver(HashMap<&'static str, MailExchangers>);

    impl MxResolver for FakeResolver {
        async fn lookup(&self, domain: &str) -> MailExchangers {
            self.0.get(domain).cloned().unwrap_or_default()
        }
    }

    /// Accepts listed (host, mailbox) pairs; `catch_all_hosts` accept anything.
    #[derive(Default)]
    struct FakeProber {
        accepts: Vec<(&'static str, &'static str)>,
        catch_all_hosts: Vec<&'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MailboxProbe for FakeProber {
        async fn probe(&self, mx_host: &str, email: &str) -> ProbeOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((mx_host.to_owned(), email.to_owned()));

            let accepted = self.catch_all_hosts.iter().any(|host| *host == mx_host)
                || self
                    .accepts
                    .iter()
                    .any(|(host, mailbox)| *host == mx_host && *mailbox == email);
            if accepted {
                ProbeOutcome::accepted()
            } else {
                ProbeOutcome::rejected("Rejected: 550 User unknown")
            }
        }
    }

    fn resolver_with(domain: &'static str, mx: MailExchangers) -> FakeResolver {
        FakeResolver(HashMap::from([(domain, mx)]))
    }

    fn mx(hosts: &[&str]) -> MailExchangers {
        MailExchangers::from_records(
            hosts
                .iter()
                .enumerate()
                .map(|(i, h)| (i as u16 * 10, h.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn bad_syntax_short_circuits() {
        let prober = FakeProber::default();
        let verifier = EmailVerifier::new(FakeResolver(HashMap::new()), prober, 3);

        let result = verifier.verify("not-an-email").await;
        assert_eq!(result, VerificationResult::new("not-an-email"));
        assert!(verifier.prober.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn domain_without_hosts_is_invalid() {
        let verifier = EmailVerifier::new(FakeResolver(HashMap::new()), FakeProber::default(), 3);

        let result = verifier.verify("user@nowhere.example").await;
        assert!(result.syntax);
        assert!(!result.mx);
        assert_eq!(result.status, VerificationStatus::Invalid);
    }

    #[tokio::test]
    async fn accepted_mailbox_on_strict_domain_is_valid() {
        let prober = FakeProber {
            accepts: vec![("mx1.example.com", "alice@example.com")],
            ..Default::default()
        };
        let verifier = EmailVerifier::new(
            resolver_with("example.com", mx(&["mx1.example.com"])),
            prober,
            3,
        );

        let result = verifier.verify("alice@example.com").await;
        assert!(result.syntax && result.mx && result.smtp_accepts);
        assert!(!result.catch_all);
        assert_eq!(result.status, VerificationStatus::Valid);

        let calls = verifier.prober.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[1].1, "alice@example.com");
        assert!(calls[1].1.ends_with("@example.com"));
    }

    #[tokio::test]
    async fn catch_all_domain_is_risky() {
        let prober = FakeProber {
            catch_all_hosts: vec!["mx.catchall.test"],
            ..Default::default()
        };
        let verifier = EmailVerifier::new(
            resolver_with("catchall.test", mx(&["mx.catchall.test"])),
            prober,
            3,
        );

        let result = verifier.verify("anyone@catchall.test").await;
        assert!(result.smtp_accepts);
        assert!(result.catch_all);
        assert_eq!(result.status, VerificationStatus::Risky);
    }

    #[tokio::test]
    async fn rejected_everywhere_is_invalid_with_mx() {
        let verifier = EmailVerifier::new(
            resolver_with("example.com", mx(&["mx1.example.com", "mx2.example.com"])),
            FakeProber::default(),
            3,
        );

        let result = verifier.verify("ghost@example.com").await;
        assert!(result.mx);
        assert!(!result.smtp_accepts);
        assert!(!result.catch_all);
        assert_eq!(result.status, VerificationStatus::Invalid);
    }

    #[tokio::test]
    async fn only_first_hosts_are_probed() {
        let prober = FakeProber {
            accepts: vec![("mx4.example.com", "alice@example.com")],
            ..Default::default()
        };
        let verifier = EmailVerifier::new(
            resolver_with(
                "example.com",
                mx(&[
                    "mx1.example.com",
                    "mx2.example.com",
                    "mx3.example.com",
                    "mx4.example.com",
                ]),
            ),
            prober,
            3,
        );

        let result = verifier.verify("alice@example.com").await;
        assert!(!result.smtp_accepts);

        let calls = verifier.prober.calls.lock().unwrap();
        let hosts: Vec<&str> = calls.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(hosts, vec!["mx1.example.com", "mx2.example.com", "mx3.example.com"]);
    }

    #[tokio::test]
    async fn later_host_acceptance_still_checks_catch_all_on_first_host() {
        let prober = FakeProber {
            accepts: vec![("mx2.example.com", "alice@example.com")],
            ..Default::default()
        };
        let verifier = EmailVerifier::new(
            resolver_with("example.com", mx(&["mx1.example.com", "mx2.example.com"])),
            prober,
            3,
        );

        let result = verifier.verify("alice@example.com").await;
        assert_eq!(result.status, VerificationStatus::Valid);

        let calls = verifier.prober.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].0, "mx1.example.com");
    }

    #[tokio::test]
    async fn implicit_mx_counts_as_mx() {
        let prober = FakeProber {
            accepts: vec![("example.org", "bob@example.org")],
            ..Default::default()
        };
        let verifier = EmailVerifier::new(
            resolver_with("example.org", MailExchangers::implicit("example.org")),
            prober,
            3,
        );

        let result = verifier.verify("bob@example.org").await;
        assert!(result.mx);
        assert_eq!(result.status, VerificationStatus::Valid);
    }

    #[tokio::test]
    async fn end_to_end_against_loopback_smtp() {
        let port = spawn_fake_smtp(&["alice@example.com"], false).await;
        let verifier = EmailVerifier::new(
            resolver_with("example.com", MailExchangers::implicit("127.0.0.1")),
            prober_for(vec![port]),
            3,
        );

        let valid = verifier.verify("alice@example.com").await;
        assert_eq!(valid.status, VerificationStatus::Valid);

        let invalid = verifier.verify("mallory@example.com").await;
        assert!(invalid.mx);
        assert!(!invalid.smtp_accepts);
        assert_eq!(invalid.status, VerificationStatus::Invalid);
    }

    #[tokio::test]
    async fn end_to_end_catch_all_loopback_smtp() {
        let port = spawn_fake_smtp(&[], true).await;
        let verifier = EmailVerifier::new(
            resolver_with("example.com", MailExchangers::implicit("127.0.0.1")),
            prober_for(vec![port]),
            3,
        );

        let result = verifier.verify("whoever@example.com").await;
        assert_eq!(result.status, VerificationStatus::Risky);
    }
}
