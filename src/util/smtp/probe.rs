use std::error::Error as StdError;
use std::fmt::Display;
use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use lettre::Address;
use lettre::transport::smtp::Error as SmtpError;
use lettre::transport::smtp::client::AsyncSmtpConnection;
use lettre::transport::smtp::commands::{Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use tracing::debug;

use crate::init::config::VerifierConfig;

/// RCPT TO reply codes that mean the server will take mail for the mailbox.
const ACCEPTING_CODES: [&str; 3] = ["250", "251", "252"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub accepted: bool,
    pub message: String,
}

impl ProbeOutcome {
    pub fn accepted() -> Self {
        ProbeOutcome {
            accepted: true,
            message: "Accepted".to_owned(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ProbeOutcome {
            accepted: false,
            message: message.into(),
        }
    }
}

/// Asks a mail exchanger whether it would accept mail for an address, without sending any.
pub trait MailboxProbe: Send + Sync {
    fn probe(&self, mx_host: &str, email: &str) -> impl Future<Output = ProbeOutcome> + Send;
}

enum PortAttempt {
    Accepted,
    Failed(String),
    /// The host name itself does not resolve; other ports cannot do better.
    Unresolvable,
}

pub struct SmtpProber {
    ports: Vec<u16>,
    connect_timeout: Duration,
    session_timeout: Duration,
    hello_name: ClientId,
}

impl SmtpProber {
    pub fn new(config: &VerifierConfig) -> Self {
        let hello_name = match &config.smtp_helo_name {
            Some(name) => ClientId::Domain(name.clone()),
            None => ClientId::default(),
        };

        SmtpProber {
            ports: config.smtp_ports.clone(),
            connect_timeout: config.smtp_connect_timeout,
            session_timeout: config.smtp_timeout,
            hello_name,
        }
    }

    async fn try_port(&self, mx_host: &str, port: u16, recipient: &Address) -> PortAttempt {
        match tokio::time::timeout(self.session_timeout, self.session(mx_host, port, recipient))
            .await
        {
            Ok(attempt) => attempt,
            Err(_) => PortAttempt::Failed(format!("Connection timeout on port {port}")),
        }
    }

    async fn session(&self, mx_host: &str, port: u16, recipient: &Address) -> PortAttempt {
        // Every resolved address is tried in order, so a dead AAAA still falls through to A.
        let addrs: Vec<SocketAddr> = match tokio::net::lookup_host((mx_host, port)).await {
            Ok(addrs) => addrs.collect(),
            Err(_) => return PortAttempt::Unresolvable,
        };
        if addrs.is_empty() {
            return PortAttempt::Unresolvable;
        }

        let mut conn = match AsyncSmtpConnection::connect_tokio1(
            addrs.as_slice(),
            Some(self.connect_timeout),
            &self.hello_name,
            None,
            None,
        )
        .await
        {
            Ok(conn) => conn,
            Err(e) => return PortAttempt::Failed(describe_connect_error(&e, port)),
        };

        let attempt = envelope(&mut conn, port, recipient).await;

        if let Err(e) = conn.quit().await {
            debug!(mx_host = %mx_host, port, error = %e, "QUIT failed");
        }

        attempt
    }
}

impl MailboxProbe for SmtpProber {
    async fn probe(&self, mx_host: &str, email: &str) -> ProbeOutcome {
        let recipient: Address = match email.parse() {
            Ok(address) => address,
            Err(e) => return ProbeOutcome::rejected(format!("Invalid recipient address: {e}")),
        };

        let mut last_error: Option<String> = None;

        for &port in &self.ports {
            match self.try_port(mx_host, port, &recipient).await {
                PortAttempt::Accepted => return ProbeOutcome::accepted(),
                PortAttempt::Failed(message) => {
                    debug!(mx_host = %mx_host, port, reason = %message, "SMTP probe attempt failed");
                    last_error = Some(message);
                }
                PortAttempt::Unresolvable => {
                    last_error = Some("Could not resolve host".to_owned());
                    break;
                }
            }
        }

        ProbeOutcome::rejected(
            last_error.unwrap_or_else(|| "All connection attempts failed".to_owned()),
        )
    }
}

/// `MAIL FROM:<>` then `RCPT TO:<recipient>`. Never reaches `DATA`.
async fn envelope(conn: &mut AsyncSmtpConnection, port: u16, recipient: &Address) -> PortAttempt {
    if let Err(e) = conn.command(Mail::new(None, vec![])).await {
        return PortAttempt::Failed(format!("MAIL FROM failed: {e}"));
    }

    match conn.command(Rcpt::new(recipient.clone(), vec![])).await {
        Ok(response) => {
            let code = response.code().to_string();
            if ACCEPTING_CODES.contains(&code.as_str()) {
                PortAttempt::Accepted
            } else {
                let text = response.message().collect::<Vec<&str>>().join(" ");
                PortAttempt::Failed(format!("Rejected: {code} {text}"))
            }
        }
        Err(e) => match e.status() {
            Some(code) => PortAttempt::Failed(format!("Rejected: {code} ({e})")),
            None => PortAttempt::Failed(format!("RCPT TO error on port {port}: {e}")),
        },
    }
}

fn describe_connect_error(e: &SmtpError, port: u16) -> String {
    connect_failure_message(io_error_kind(e), port, e)
}

fn connect_failure_message(kind: Option<ErrorKind>, port: u16, e: &dyn Display) -> String {
    match kind {
        Some(ErrorKind::TimedOut) => format!("Connection timeout on port {port}"),
        Some(ErrorKind::ConnectionRefused) if port == 25 => {
            "Port 25 blocked (outbound port 25 is commonly filtered by cloud providers)".to_owned()
        }
        Some(_) => format!("Connection error on port {port}: {e}"),
        None => format!("SMTP error on port {port}: {e}"),
    }
}

fn io_error_kind(e: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = err.source();
    }
    None
}
