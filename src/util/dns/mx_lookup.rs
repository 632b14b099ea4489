use std::future::Future;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::Name;
use tracing::{debug, warn};

/// Mail hosts for a domain, in the order they should be tried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailExchangers {
    /// True only when explicit MX records were found.
    pub has_mx: bool,
    pub hosts: Vec<String>,
}

impl MailExchangers {
    pub fn none() -> Self {
        Self::default()
    }

    /// Domain without MX that still resolves: mail goes to the domain itself.
    pub fn implicit(domain: &str) -> Self {
        MailExchangers {
            has_mx: false,
            hosts: vec![domain.to_owned()],
        }
    }

    /// Sorts `(preference, exchange)` pairs by preference, keeping record order for ties.
    pub fn from_records(mut records: Vec<(u16, String)>) -> Self {
        records.sort_by_key(|(preference, _)| *preference);
        MailExchangers {
            has_mx: true,
            hosts: records.into_iter().map(|(_, host)| host).collect(),
        }
    }
}

/// `(preference, exchange)` pairs with null MX (root exchange) dropped and the trailing dot
/// removed.
fn usable_exchanges<'a>(records: impl Iterator<Item = (u16, &'a Name)>) -> Vec<(u16, String)> {
    records
        .filter(|(_, exchange)| !exchange.is_root())
        .map(|(preference, exchange)| {
            (
                preference,
                exchange.to_utf8().trim_end_matches('.').to_owned(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MxErrorAction {
    /// No MX published (or no usable nameserver): mail may still go to the A record.
    TryAddress,
    GiveUp,
}

fn on_mx_error(kind: &ResolveErrorKind) -> MxErrorAction {
    match kind {
        ResolveErrorKind::NoRecordsFound { .. } | ResolveErrorKind::NoConnections => {
            MxErrorAction::TryAddress
        }
        _ => MxErrorAction::GiveUp,
    }
}

pub trait MxResolver: Send + Sync {
    fn lookup(&self, domain: &str) -> impl Future<Output = MailExchangers> + Send;
}

pub struct DnsMxResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsMxResolver {
    /// Uses the system resolver configuration, falling back to the library default upstreams.
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "Could not read system DNS config; using default upstreams");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;

        DnsMxResolver {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }

    async fn resolve_mx(&self, fqdn: &str) -> Result<Vec<(u16, String)>, ResolveError> {
        let lookup = self.resolver.mx_lookup(fqdn).await?;

        Ok(usable_exchanges(
            lookup.iter().map(|mx| (mx.preference(), mx.exchange())),
        ))
    }

    async fn fallback_to_a(&self, domain: &str, fqdn: &str) -> MailExchangers {
        if self.has_a_record(domain, fqdn).await {
            MailExchangers::implicit(domain)
        } else {
            MailExchangers::none()
        }
    }

    async fn has_a_record(&self, domain: &str, fqdn: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.resolver.ipv4_lookup(fqdn)).await {
            Ok(Ok(lookup)) => lookup.iter().next().is_some(),
            Ok(Err(e)) => {
                debug!(domain = %domain, error = %e, "No A record");
                false
            }
            Err(_) => {
                debug!(domain = %domain, "A lookup timed out");
                false
            }
        }
    }
}

impl MxResolver for DnsMxResolver {
    async fn lookup(&self, domain: &str) -> MailExchangers {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        match tokio::time::timeout(self.timeout, self.resolve_mx(&fqdn)).await {
            Ok(Ok(records)) if !records.is_empty() => MailExchangers::from_records(records),
            Ok(Ok(_)) => self.fallback_to_a(domain, &fqdn).await,
            Ok(Err(e)) => match on_mx_error(e.kind()) {
                MxErrorAction::TryAddress => self.fallback_to_a(domain, &fqdn).await,
                MxErrorAction::GiveUp => {
                    warn!(domain = %domain, error = %e, "MX lookup failed");
                    MailExchangers::none()
                }
            },
            Err(_) => {
                debug!(domain = %domain, "MX lookup timed out");
                MailExchangers::none()
            }
        }
    }
}
