use crate::gateways::Provider;
use crate::router::cycle::CycleConfig;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::fmt;

/// A configuration value that must never show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Live,
    Mock,
}

#[derive(Debug, Clone)]
pub struct OperatorAccount {
    pub public_key: Option<String>,
    pub secret_key: Secret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub redis_url: String,
    pub rate_limit_per_minute: i64,
    pub internal_api_key: Option<Secret>,
    pub gateway_mode: GatewayMode,
    pub gateway_timeout_ms: u64,
    pub base_urls: HashMap<Provider, String>,
    pub operator_accounts: HashMap<Provider, OperatorAccount>,
    /// Keyed by integration slug. Integrations without an entry are not served.
    pub routing_cycles: HashMap<String, CycleConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let gateway_mode = match get("GATEWAY_MODE").as_deref() {
            None | Some("live") => GatewayMode::Live,
            Some("mock") => GatewayMode::Mock,
            Some(other) => bail!("GATEWAY_MODE must be 'live' or 'mock', got '{other}'"),
        };

        let rate_limit_per_minute = match get("RATE_LIMIT_PER_MINUTE") {
            Some(v) => v
                .parse::<i64>()
                .with_context(|| format!("RATE_LIMIT_PER_MINUTE is not an integer: {v}"))?,
            None => 300,
        };

        let gateway_timeout_ms = match get("GATEWAY_TIMEOUT_MS") {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("GATEWAY_TIMEOUT_MS is not an integer: {v}"))?,
            None => 10_000,
        };

        let base_urls = Provider::ALL
            .iter()
            .map(|p| {
                let url = get(&format!("{}_BASE_URL", p.env_prefix()))
                    .unwrap_or_else(|| p.default_base_url().to_string());
                (*p, url)
            })
            .collect();

        let mut operator_accounts = HashMap::new();
        for provider in Provider::ALL {
            let prefix = provider.env_prefix();
            if let Some(secret) = get(&format!("{prefix}_OPERATOR_SECRET_KEY")) {
                operator_accounts.insert(
                    provider,
                    OperatorAccount {
                        public_key: get(&format!("{prefix}_OPERATOR_PUBLIC_KEY")),
                        secret_key: Secret::new(secret),
                    },
                );
            }
        }

        let mut routing_cycles = HashMap::new();
        for spec in crate::integrations::CATALOG {
            let key = spec.cycle_env_key();
            if let Some(raw) = get(&key) {
                let cycle = raw
                    .parse::<CycleConfig>()
                    .map_err(|e| anyhow!("{key}: {e}"))?;
                routing_cycles.insert(spec.slug.to_string(), cycle);
            }
        }

        Ok(Self {
            store_backend,
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3434".to_string()),
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379/".to_string()),
            rate_limit_per_minute,
            internal_api_key: get("INTERNAL_API_KEY").map(Secret::new),
            gateway_mode,
            gateway_timeout_ms,
            base_urls,
            operator_accounts,
            routing_cycles,
        })
    }
}
