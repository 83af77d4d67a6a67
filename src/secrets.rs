//! API key lookup: managed secrets file first, then the process environment,
//! then a `.env` file in the working directory or one of its parents.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use strum::Display;

/// Bearer credential for the completion endpoint.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KeySource {
    #[strum(serialize = "secrets file")]
    SecretsFile,
    #[strum(serialize = "environment")]
    Environment,
    #[strum(serialize = ".env file")]
    DotEnv,
}

/// Flat `NAME = "value"` table read from a toml file
#[derive(Debug, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

impl SecretStore {
    /// Read the store; a missing file is an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
        let values = toml::from_str::<HashMap<String, String>>(&content)
            .with_context(|| format!("Failed to parse secrets file {}", path.display()))?;
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Resolve `name` from the store, then the process environment, then `.env`.
///
/// A real environment variable wins over `.env`, and the `.env` file is only
/// read, never exported into the process environment.
pub fn resolve_api_key(store: &SecretStore, name: &str) -> Option<(ApiKey, KeySource)> {
    resolve_with(store, name, |var| std::env::var(var).ok(), dotenv_var)
}

fn dotenv_var(name: &str) -> Option<String> {
    match dotenvy::dotenv_iter() {
        Ok(iter) => find_var(iter, name),
        Err(err) if err.not_found() => None,
        Err(err) => {
            tracing::warn!(error = %err, "could not read .env file");
            None
        }
    }
}

fn find_var<R: Read>(iter: dotenvy::Iter<R>, name: &str) -> Option<String> {
    let mut found = None;
    for item in iter {
        match item {
            // later assignments win, as when the file is sourced
            Ok((key, value)) if key == name => found = Some(value),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed .env line");
            }
        }
    }
    found
}

fn resolve_with<E, D>(
    store: &SecretStore,
    name: &str,
    env: E,
    dotenv: D,
) -> Option<(ApiKey, KeySource)>
where
    E: Fn(&str) -> Option<String>,
    D: Fn(&str) -> Option<String>,
{
    if let Some(value) = store.get(name).filter(|v| !v.is_empty()) {
        return Some((ApiKey::new(value), KeySource::SecretsFile));
    }
    if let Some(value) = env(name).filter(|v| !v.is_empty()) {
        return Some((ApiKey::new(value), KeySource::Environment));
    }
    dotenv(name)
        .filter(|v| !v.is_empty())
        .map(|value| (ApiKey::new(value), KeySource::DotEnv))
}
