//! Connection string parsing
//!
//! Format: `docmeta://host[:port][,host[:port]...][?key=value&...]`
//!
//! The scheme may be omitted. Hosts are tried in the order given.

use crate::server::normalize_address;
use docmeta_core::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The only accepted scheme
pub const SCHEME: &str = "docmeta";

/// A parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    hosts: Vec<String>,
    params: BTreeMap<String, String>,
}

impl ConnectionString {
    /// Normalized `host:port` addresses, in connection order
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Query parameters
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// A single parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = match s.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case(SCHEME) => rest,
            Some((scheme, _)) => {
                return Err(Error::invalid_argument(format!(
                    "unsupported scheme '{}' in connection string",
                    scheme
                )))
            }
            None => s,
        };

        let (host_part, query) = match rest.split_once('?') {
            Some((hosts, query)) => (hosts, Some(query)),
            None => (rest, None),
        };

        let hosts: Vec<String> = host_part
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(normalize_address)
            .collect();
        if hosts.is_empty() {
            return Err(Error::invalid_argument(format!(
                "connection string '{}' names no hosts",
                s
            )));
        }

        let mut params = BTreeMap::new();
        for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::invalid_argument(format!("malformed connection parameter '{}'", pair))
            })?;
            params.insert(key.to_string(), value.to_string());
        }

        Ok(ConnectionString { hosts, params })
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", SCHEME, self.hosts.join(","))?;
        if !self.params.is_empty() {
            let query: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "?{}", query.join("&"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_host() {
        let cs: ConnectionString = "docmeta://localhost".parse().unwrap();
        assert_eq!(cs.hosts(), &["localhost:11210".to_string()]);
        assert!(cs.params().is_empty());
    }

    #[test]
    fn test_parse_hosts_and_params() {
        let cs: ConnectionString = "docmeta://db1:9000, db2?workers=4&preserve_order=false"
            .parse()
            .unwrap();
        assert_eq!(
            cs.hosts(),
            &["db1:9000".to_string(), "db2:11210".to_string()]
        );
        assert_eq!(cs.param("workers"), Some("4"));
        assert_eq!(cs.param("preserve_order"), Some("false"));
    }

    #[test]
    fn test_scheme_optional() {
        let cs: ConnectionString = "db1".parse().unwrap();
        assert_eq!(cs.to_string(), "docmeta://db1:11210");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("http://db1".parse::<ConnectionString>().is_err());
        assert!("docmeta://".parse::<ConnectionString>().is_err());
        assert!("docmeta://db1?workers".parse::<ConnectionString>().is_err());
    }
}
