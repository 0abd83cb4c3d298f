//! Runtime settings read from the environment
//!
//! Expected environment variables:
//! - FINOPS_STORE_URL: PostgREST base URL (required unless running in memory)
//! - FINOPS_SERVICE_KEY: Service-role API key (optional)
//! - FINOPS_ANON_KEY: Anonymous API key (optional, ignored when a service key is set)
//! - FINOPS_BIND: Listen address for `serve` (default 0.0.0.0:8080)
//! - FINOPS_CHUNK_SIZE: Records per bulk insert (default 100)
//! - FINOPS_PAGE_SIZE: Rows per page when listing (default 1000)
//! - FINOPS_UNIQUE_VIOLATION_CODES: Comma-separated store codes meaning "duplicate" (default 23505)
//! - FINOPS_CATALOG: Path to a collections.yml replacing the built-in catalog (optional)

use crate::client::{Auth, AuthType, PostgrestClient};
use crate::collections::CollectionCatalog;
use crate::ingest::{BulkConfig, DEFAULT_CHUNK_SIZE};
use crate::store::{ConstraintClassifier, DEFAULT_PAGE_SIZE, DEFAULT_UNIQUE_CODES};
use eyre::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store_url: Option<Url>,
    pub service_key: Option<String>,
    pub anon_key: Option<String>,
    pub bind: SocketAddr,
    pub chunk_size: usize,
    pub page_size: usize,
    pub unique_codes: Vec<String>,
    pub catalog: Option<PathBuf>,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Positive integer from `name`, or `default` when unset or invalid
fn positive(name: &str, default: usize) -> usize {
    match var(name).map(|v| v.parse::<usize>()) {
        Some(Ok(n)) if n > 0 => n,
        Some(_) => {
            log::warn!("Ignoring invalid {}, using {}", name, default);
            default
        }
        None => default,
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        let store_url = var("FINOPS_STORE_URL")
            .map(|raw| {
                Url::parse(&raw).with_context(|| format!("Invalid FINOPS_STORE_URL: {}", raw))
            })
            .transpose()?;

        let bind = var("FINOPS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse()
            .with_context(|| format!("Invalid FINOPS_BIND: {}", bind))?;

        let unique_codes = var("FINOPS_UNIQUE_VIOLATION_CODES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|codes| !codes.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIQUE_CODES.iter().map(|c| c.to_string()).collect());

        Ok(Self {
            store_url,
            service_key: var("FINOPS_SERVICE_KEY"),
            anon_key: var("FINOPS_ANON_KEY"),
            bind,
            chunk_size: positive("FINOPS_CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            page_size: positive("FINOPS_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            unique_codes,
            catalog: var("FINOPS_CATALOG").map(PathBuf::from),
        })
    }

    /// Which key the store client will send
    pub fn auth_type(&self) -> AuthType {
        if self.service_key.is_some() {
            AuthType::Service
        } else if self.anon_key.is_some() {
            AuthType::Anon
        } else {
            AuthType::None
        }
    }

    pub fn auth(&self) -> Auth {
        Auth::new(
            &self.auth_type(),
            self.service_key.clone(),
            self.anon_key.clone(),
        )
    }

    /// Build the PostgREST client
    pub fn postgrest_client(&self) -> Result<PostgrestClient> {
        let url = self
            .store_url
            .clone()
            .ok_or_else(|| eyre::eyre!("FINOPS_STORE_URL environment variable not set"))?;
        PostgrestClient::try_new(url, self.auth()).context("Failed to create store client")
    }

    pub fn bulk_config(&self) -> BulkConfig {
        BulkConfig::with_chunk_size(self.chunk_size)
    }

    pub fn classifier(&self) -> ConstraintClassifier {
        ConstraintClassifier::new(self.unique_codes.iter().cloned())
    }

    /// The configured catalog file, or the built-in catalog
    pub fn catalog(&self) -> Result<CollectionCatalog> {
        match &self.catalog {
            Some(path) => CollectionCatalog::read(path),
            None => Ok(CollectionCatalog::builtin()),
        }
    }
}
