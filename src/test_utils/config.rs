use crate::config::{
    Config, DEFAULT_PROXY_AMOUNT_SCALE, DEFAULT_YNAB_BASE_URL, UpstreamMode,
};

/// A [Config] for `mode` with every setting at its default and nothing read
/// from the process environment.
pub(crate) fn default_config(mode: UpstreamMode) -> Config {
    Config {
        port: 3000,
        mode,
        upstream_base_url: None,
        upstream_auth_header: None,
        upstream_auth_token: None,
        proxy_amount_scale: DEFAULT_PROXY_AMOUNT_SCALE,
        ynab_base_url: DEFAULT_YNAB_BASE_URL.to_owned(),
        ynab_budget_id: None,
        ynab_access_token: None,
        upstream_timeout_secs: 10,
        session_secret: None,
    }
}
