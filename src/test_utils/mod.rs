#![allow(missing_docs)]

pub(crate) mod config;
pub(crate) mod cookie;
pub(crate) mod upstream;

pub(crate) use config::default_config;
pub(crate) use cookie::session_cookie_header;
pub(crate) use upstream::{closed_port_url, spawn_stub_upstream};
