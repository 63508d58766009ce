//! Server address newtype with canonicalization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Port used when an address omits one.
pub const DEFAULT_PORT: u16 = 27017;

/// Canonical `host:port` address of a single server.
///
/// Hosts are lowercased and a missing port becomes [`DEFAULT_PORT`], so two
/// spellings of the same endpoint compare equal. IPv6 literals keep their
/// brackets (`[::1]:27017`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    /// Parse and canonicalize an address string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] for an empty host, an
    /// unparsable port, or an unbracketed IPv6 literal.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ConfigError::InvalidAddress {
            address: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty address"));
        }
        let lower = trimmed.to_ascii_lowercase();

        let (host, port) = if let Some(rest) = lower.strip_prefix('[') {
            let (inner, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            let port = match tail {
                "" => None,
                t => Some(
                    t.strip_prefix(':')
                        .ok_or_else(|| invalid("unexpected characters after IPv6 literal"))?,
                ),
            };
            (format!("[{inner}]"), port)
        } else {
            match lower.rsplit_once(':') {
                Some((h, _)) if h.contains(':') => {
                    return Err(invalid("IPv6 literals must be bracketed"))
                }
                Some((h, p)) => (h.to_string(), Some(p)),
                None => (lower.clone(), None),
            }
        };

        if host.is_empty() || host == "[]" {
            return Err(invalid("empty host"));
        }
        let port = match port {
            Some(p) => p.parse::<u16>().map_err(|_| invalid("invalid port"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self { host, port })
    }

    /// Host part, lowercased (IPv6 literals keep their brackets).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl TryFrom<String> for Address {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for Address {
    type Error = ConfigError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

impl std::str::FromStr for Address {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
