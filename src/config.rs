//! Server configuration read from command line flags and environment variables.

use std::{collections::HashMap, ffi::OsString};

use clap::{Parser, ValueEnum};

/// The prefix of the environment variables that map a category name to a YNAB
/// category ID, e.g. `YNAB_CATEGORY_FOOD`.
pub const CATEGORY_ENV_PREFIX: &str = "YNAB_CATEGORY_";

/// The YNAB API root used when no base URL is configured.
pub const DEFAULT_YNAB_BASE_URL: &str = "https://api.ynab.com/v1";

/// The divisor applied to the proxy's `amount` field when no decimal amount is
/// present.
///
/// The proxy has historically been treated as sending milliunits of cents, so
/// the default divides by 1000 and then by 100.
pub const DEFAULT_PROXY_AMOUNT_SCALE: f64 = 100_000.0;

/// Which upstream API transactions are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UpstreamMode {
    /// A generic REST proxy that takes the category, year and month in the path.
    Proxy,
    /// The YNAB API, queried by category ID.
    Ynab,
}

/// The configuration for the transactions server.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Which upstream API to fetch transactions from.
    #[arg(long, env = "UPSTREAM_MODE", value_enum, default_value_t = UpstreamMode::Proxy)]
    pub mode: UpstreamMode,

    /// Base URL of the generic transactions proxy.
    #[arg(long, env = "UPSTREAM_BASE_URL")]
    pub upstream_base_url: Option<String>,

    /// Name of an optional header sent to the proxy for authorization.
    #[arg(long, env = "UPSTREAM_AUTH_HEADER")]
    pub upstream_auth_header: Option<String>,

    /// Value of the optional proxy authorization header.
    #[arg(long, env = "UPSTREAM_AUTH_TOKEN", hide_env_values = true)]
    pub upstream_auth_token: Option<String>,

    /// Divisor for converting the proxy's integer `amount` into a decimal amount.
    #[arg(long, env = "PROXY_AMOUNT_SCALE", default_value_t = DEFAULT_PROXY_AMOUNT_SCALE)]
    pub proxy_amount_scale: f64,

    /// Base URL of the YNAB API.
    #[arg(long, env = "YNAB_BASE_URL", default_value = DEFAULT_YNAB_BASE_URL)]
    pub ynab_base_url: String,

    /// The YNAB budget to read transactions from.
    #[arg(long, env = "YNAB_BUDGET_ID")]
    pub ynab_budget_id: Option<String>,

    /// Personal access token for the YNAB API.
    #[arg(long, env = "YNAB_ACCESS_TOKEN", hide_env_values = true)]
    pub ynab_access_token: Option<String>,

    /// Timeout in seconds for each call to the upstream API.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 10)]
    pub upstream_timeout_secs: u64,

    /// Secret used to derive the key for decrypting session cookies.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,
}

impl Config {
    /// The proxy settings from this config.
    pub fn proxy_config(&self) -> ProxyConfig {
        let auth_header = match (&self.upstream_auth_header, &self.upstream_auth_token) {
            (Some(name), Some(value)) => Some((name.clone(), value.clone())),
            _ => None,
        };

        ProxyConfig {
            base_url: self.upstream_base_url.clone(),
            auth_header,
            amount_scale: self.proxy_amount_scale,
        }
    }

    /// The YNAB settings from this config.
    ///
    /// `vars` supplies the environment variables to read category mappings
    /// from, usually [std::env::vars].
    pub fn ynab_config(&self, vars: impl IntoIterator<Item = (String, String)>) -> YnabConfig {
        YnabConfig {
            base_url: self.ynab_base_url.clone(),
            budget_id: self.ynab_budget_id.clone(),
            access_token: self.ynab_access_token.clone(),
            category_ids: category_ids_from_vars(vars),
        }
    }

    /// Log a warning for every setting the selected upstream mode needs but
    /// does not have.
    ///
    /// Missing settings do not stop the server, requests fail with a server
    /// configuration error instead.
    pub fn warn_missing_settings(&self) {
        match self.mode {
            UpstreamMode::Proxy => {
                if self.upstream_base_url.is_none() {
                    tracing::warn!("UPSTREAM_BASE_URL is not set, requests will fail.");
                }
                if self.upstream_auth_header.is_some() != self.upstream_auth_token.is_some() {
                    tracing::warn!(
                        "Only one of UPSTREAM_AUTH_HEADER and UPSTREAM_AUTH_TOKEN is set, \
                        no auth header will be sent."
                    );
                }
            }
            UpstreamMode::Ynab => {
                if self.ynab_budget_id.is_none() {
                    tracing::warn!("YNAB_BUDGET_ID is not set, requests will fail.");
                }
                if self.ynab_access_token.is_none() {
                    tracing::warn!("YNAB_ACCESS_TOKEN is not set, requests will fail.");
                }
                if self.session_secret.is_none() {
                    tracing::warn!("SESSION_SECRET is not set, all requests will be unauthorized.");
                }
            }
        }
    }
}

/// Settings for the generic transactions proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    /// Base URL of the proxy, `None` if not configured.
    pub base_url: Option<String>,
    /// An optional header name and value sent with every request.
    pub auth_header: Option<(String, String)>,
    /// Divisor for converting integer `amount` values to decimal amounts.
    pub amount_scale: f64,
}

/// Settings for the YNAB API.
#[derive(Debug, Clone, PartialEq)]
pub struct YnabConfig {
    /// Base URL of the YNAB API.
    pub base_url: String,
    /// The budget to read transactions from, `None` if not configured.
    pub budget_id: Option<String>,
    /// The personal access token, `None` if not configured.
    pub access_token: Option<String>,
    /// YNAB category IDs keyed by their environment variable name,
    /// e.g. `YNAB_CATEGORY_FOOD`.
    pub category_ids: HashMap<String, String>,
}

impl YnabConfig {
    /// Get the YNAB category ID for `category`.
    ///
    /// Category names are matched case-insensitively by upper-casing them and
    /// adding [CATEGORY_ENV_PREFIX].
    pub fn category_id(&self, category: &str) -> Option<&str> {
        let key = format!("{CATEGORY_ENV_PREFIX}{}", category.to_uppercase());

        self.category_ids.get(&key).map(String::as_str)
    }
}

/// Collect the category mappings from `vars`, keeping every variable that
/// starts with [CATEGORY_ENV_PREFIX] and has a non-empty value.
pub fn category_ids_from_vars(
    vars: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    vars.into_iter()
        .filter(|(key, value)| {
            key.len() > CATEGORY_ENV_PREFIX.len()
                && key.starts_with(CATEGORY_ENV_PREFIX)
                && !value.trim().is_empty()
        })
        .collect()
}

/// Keep the variables in `vars` whose names and values are valid unicode,
/// usually from [std::env::vars_os].
///
/// Variables that [std::env::vars] would panic on are skipped instead.
pub fn unicode_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::debug!("Ignoring environment variable {key} with a non-unicode value");
                None
            }
            (Err(key), _) => {
                tracing::debug!("Ignoring environment variable with non-unicode name {key:?}");
                None
            }
        })
}
