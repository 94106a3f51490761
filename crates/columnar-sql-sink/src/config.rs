//! Connection settings.

use relay_core::{SinkError, SinkResult};
use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnarConfig {
    /// `host:port` entries; the first is primary, the rest are alternates.
    pub hosts: Vec<String>,
    pub username: String,
    pub password: String,
    pub database: String,
    pub debug: bool,
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

impl ColumnarConfig {
    /// Driver DSN:
    /// `tcp://host?username=..&password=..&database=..&debug=..[&alt_hosts=h2,h3]`.
    pub fn connection_string(&self) -> SinkResult<String> {
        let (primary, alternates) = self.hosts.split_first().ok_or_else(|| {
            SinkError::Config(
                "no valid hosts provided, set at least one host to connect to".to_string(),
            )
        })?;

        let mut dsn = format!(
            "tcp://{}?username={}&password={}&database={}&debug={}",
            primary,
            encode(&self.username),
            encode(&self.password),
            encode(&self.database),
            self.debug
        );
        if !alternates.is_empty() {
            dsn.push_str("&alt_hosts=");
            dsn.push_str(&alternates.join(","));
        }
        Ok(dsn)
    }

    /// Hosts and database, safe to log.
    pub fn describe(&self) -> String {
        format!("{} / {}", self.hosts.join(","), self.database)
    }
}
