use crate::config::AppConfig;
use crate::error::RelayError;
use crate::gateways::{GatewayCredentials, Provider};
use crate::router::cycle::{CycleConfig, GatewaySelector, RouteTarget};
use anyhow::bail;
use serde::Serialize;
use std::collections::HashMap;

/// A pairing of the client's own provider with the operator's fallback one.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationSpec {
    pub slug: &'static str,
    pub client_provider: Provider,
    pub operator_provider: Provider,
}

impl IntegrationSpec {
    pub fn cycle_env_key(&self) -> String {
        format!(
            "ROUTING_CYCLE_{}",
            self.slug.to_ascii_uppercase().replace('-', "_")
        )
    }
}

pub const CATALOG: [IntegrationSpec; 3] = [
    IntegrationSpec {
        slug: "ghostpay",
        client_provider: Provider::GhostPay,
        operator_provider: Provider::BlackCat,
    },
    IntegrationSpec {
        slug: "skale-blackcat",
        client_provider: Provider::SkalePay,
        operator_provider: Provider::BlackCat,
    },
    IntegrationSpec {
        slug: "brazapay-4mpagamentos",
        client_provider: Provider::FourM,
        operator_provider: Provider::BrazaPay,
    },
];

#[derive(Debug, Clone)]
pub struct Integration {
    pub spec: IntegrationSpec,
    pub selector: GatewaySelector,
    pub operator_credentials: GatewayCredentials,
}

impl Integration {
    pub fn slug(&self) -> &'static str {
        self.spec.slug
    }

    pub fn provider_for(&self, target: RouteTarget) -> Provider {
        match target {
            RouteTarget::ClientGateway => self.spec.client_provider,
            RouteTarget::OperatorGateway => self.spec.operator_provider,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationView {
    pub slug: &'static str,
    pub client_provider: &'static str,
    pub operator_provider: &'static str,
    pub cycle: CycleConfig,
}

#[derive(Debug, Clone, Default)]
pub struct IntegrationCatalog {
    enabled: HashMap<&'static str, Integration>,
}

impl IntegrationCatalog {
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let mut catalog = Self::default();
        for spec in CATALOG {
            let Some(cycle) = cfg.routing_cycles.get(spec.slug) else {
                tracing::warn!(
                    integration = spec.slug,
                    env = %spec.cycle_env_key(),
                    "no routing cycle configured, integration disabled"
                );
                continue;
            };
            let Some(account) = cfg.operator_accounts.get(&spec.operator_provider) else {
                bail!(
                    "integration {} routes to {} but {}_OPERATOR_SECRET_KEY is not set",
                    spec.slug,
                    spec.operator_provider,
                    spec.operator_provider.env_prefix()
                );
            };
            catalog.insert(
                spec,
                *cycle,
                GatewayCredentials {
                    secret: account.secret_key.expose().to_string(),
                    public_key: account.public_key.clone(),
                },
            );
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, spec: IntegrationSpec, cycle: CycleConfig, operator_credentials: GatewayCredentials) {
        self.enabled.insert(
            spec.slug,
            Integration {
                spec,
                selector: GatewaySelector::new(cycle),
                operator_credentials,
            },
        );
    }

    pub fn get(&self, slug: &str) -> Result<&Integration, RelayError> {
        self.enabled
            .get(slug)
            .ok_or_else(|| RelayError::NotFound(format!("integration '{slug}' is not enabled")))
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    pub fn views(&self) -> Vec<IntegrationView> {
        let mut views: Vec<IntegrationView> = self
            .enabled
            .values()
            .map(|i| IntegrationView {
                slug: i.spec.slug,
                client_provider: i.spec.client_provider.as_str(),
                operator_provider: i.spec.operator_provider.as_str(),
                cycle: i.selector.cycle(),
            })
            .collect();
        views.sort_by_key(|v| v.slug);
        views
    }
}
