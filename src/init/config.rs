use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const DEFAULT_DNS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SMTP_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SMTP_PORTS: [u16; 3] = [25, 587, 465];
const DEFAULT_SMTP_MAX_MX_HOSTS: usize = 3;
const DEFAULT_MAX_CONCURRENT_VERIFICATIONS: usize = 4;
const DEFAULT_VERIFICATION_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub dns_timeout: Duration,
    pub smtp_connect_timeout: Duration,
    pub smtp_timeout: Duration,
    pub smtp_ports: Vec<u16>,
    /// EHLO name; `None` falls back to the local hostname.
    pub smtp_helo_name: Option<String>,
    pub max_mx_hosts: usize,
    pub max_concurrent_verifications: usize,
    /// Zero disables the result cache.
    pub cache_ttl: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            dns_timeout: Duration::from_secs(DEFAULT_DNS_TIMEOUT_SECS),
            smtp_connect_timeout: Duration::from_secs(DEFAULT_SMTP_CONNECT_TIMEOUT_SECS),
            smtp_timeout: Duration::from_secs(DEFAULT_SMTP_TIMEOUT_SECS),
            smtp_ports: DEFAULT_SMTP_PORTS.to_vec(),
            smtp_helo_name: None,
            max_mx_hosts: DEFAULT_SMTP_MAX_MX_HOSTS,
            max_concurrent_verifications: DEFAULT_MAX_CONCURRENT_VERIFICATIONS,
            cache_ttl: Duration::from_secs(DEFAULT_VERIFICATION_CACHE_TTL_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub request_timeout: Duration,
    pub logging: LoggingConfig,
    pub verifier: VerifierConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        if std::env::var("IS_AWS").is_err() {
            if let Err(e) = dotenvy::dotenv() {
                if !e.not_found() {
                    return Err(anyhow!("Could not load .env file: {e}"));
                }
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let workers = at_least_one(&lookup, "WORKERS", DEFAULT_WORKERS)?;
        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let level = lookup("LOG_LEVEL")
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "info".to_owned());

        let format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") => LogFormat::Text,
            Some(s) => match s.to_ascii_lowercase().as_str() {
                "text" | "pretty" | "plain" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => return Err(anyhow!("Unsupported LOG_FORMAT '{other}'; use text or json")),
            },
        };

        let smtp_ports = match lookup("SMTP_PORTS") {
            Some(raw) => parse_port_list(&raw)?,
            None => DEFAULT_SMTP_PORTS.to_vec(),
        };

        let smtp_helo_name = lookup("SMTP_HELO_NAME")
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty());

        let verifier = VerifierConfig {
            dns_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DNS_TIMEOUT_SECS",
                DEFAULT_DNS_TIMEOUT_SECS,
            )?),
            smtp_connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SMTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_SMTP_CONNECT_TIMEOUT_SECS,
            )?),
            smtp_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SMTP_TIMEOUT_SECS",
                DEFAULT_SMTP_TIMEOUT_SECS,
            )?),
            smtp_ports,
            smtp_helo_name,
            max_mx_hosts: at_least_one(&lookup, "SMTP_MAX_MX_HOSTS", DEFAULT_SMTP_MAX_MX_HOSTS)?,
            max_concurrent_verifications: at_least_one(
                &lookup,
                "MAX_CONCURRENT_VERIFICATIONS",
                DEFAULT_MAX_CONCURRENT_VERIFICATIONS,
            )?,
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "VERIFICATION_CACHE_TTL_SECS",
                DEFAULT_VERIFICATION_CACHE_TTL_SECS,
            )?),
        };

        Ok(ServerConfig {
            host,
            port,
            workers,
            request_timeout,
            logging: LoggingConfig { level, format },
            verifier,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Environment variable {key} is invalid ('{raw}'): {e}")),
        _ => Ok(default),
    }
}

fn at_least_one<F>(lookup: &F, key: &str, default: usize) -> anyhow::Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(anyhow!("Environment variable {key} must be at least 1"));
    }
    Ok(value)
}

fn parse_port_list(raw: &str) -> anyhow::Result<Vec<u16>> {
    let ports = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u16>()
                .map_err(|e| anyhow!("Invalid port '{p}' in SMTP_PORTS: {e}"))
        })
        .collect::<anyhow::Result<Vec<u16>>>()?;

    if ports.is_empty() {
        return Err(anyhow!("SMTP_PORTS must list at least one port"));
    }

    Ok(ports)
}
