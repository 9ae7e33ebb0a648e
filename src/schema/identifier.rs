//! Identifiers which may appear in certificates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A subject a certificate may be issued for.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum Identifier {
    /// A DNS name, possibly a wildcard (`*.example.org`).
    Dns {
        /// The hostname.
        value: String,
    },

    /// An IP address identifier (RFC 8738).
    Ip {
        /// The textual form of the address.
        value: String,
    },
}

impl Identifier {
    /// A DNS identifier for `hostname`.
    pub fn dns(hostname: impl Into<String>) -> Identifier {
        Self::Dns {
            value: hostname.into(),
        }
    }

    /// An IP identifier for `address`.
    pub fn ip(address: std::net::IpAddr) -> Identifier {
        Self::Ip {
            value: address.to_string(),
        }
    }

    /// The identifier value, without its type.
    pub fn value(&self) -> &str {
        match self {
            Identifier::Dns { value } | Identifier::Ip { value } => value,
        }
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dns { value } => f.debug_tuple("Identifier::DNS").field(value).finish(),
            Self::Ip { value } => f.debug_tuple("Identifier::IP").field(value).finish(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        let value = serde_json::to_value(Identifier::dns("www.example.org")).unwrap();
        assert_eq!(value, serde_json::json!({"type": "dns", "value": "www.example.org"}));

        let ip: Identifier =
            serde_json::from_str(r#"{"type": "ip", "value": "192.0.2.1"}"#).unwrap();
        assert_eq!(ip, Identifier::ip("192.0.2.1".parse().unwrap()));
        assert_eq!(ip.to_string(), "192.0.2.1");
    }
}
