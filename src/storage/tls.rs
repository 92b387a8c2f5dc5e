//! TLS options attached to a storage.
//!
//! Only storage of the settings lives here; the watchdog's connector refuses
//! modes that would require a handshake.

use std::fmt;
use std::str::FromStr;

use crate::storage::rule::{dup_opt, AllocationError};

/// TLS negotiation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    Disable,
    Allow,
    Require,
    VerifyCa,
    VerifyFull,
}

impl TlsMode {
    /// True when a plaintext connection is not acceptable.
    pub fn requires_tls(&self) -> bool {
        matches!(self, TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull)
    }
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(TlsMode::Disable),
            "allow" => Ok(TlsMode::Allow),
            "require" => Ok(TlsMode::Require),
            "verify_ca" => Ok(TlsMode::VerifyCa),
            "verify_full" => Ok(TlsMode::VerifyFull),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TlsMode::Disable => "disable",
            TlsMode::Allow => "allow",
            TlsMode::Require => "require",
            TlsMode::VerifyCa => "verify_ca",
            TlsMode::VerifyFull => "verify_full",
        };
        f.write_str(s)
    }
}

/// TLS settings for one storage. Every field is optional.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TlsOpts {
    pub mode: TlsMode,
    /// Mode string as written in the configuration.
    pub tls: Option<String>,
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    /// Comma separated protocol list, e.g. `tlsv1.2,tlsv1.3`.
    pub protocols: Option<String>,
}

impl TlsOpts {
    /// Protocols as a list, empty entries skipped.
    pub fn protocols(&self) -> Vec<&str> {
        self.protocols
            .as_deref()
            .map(|p| {
                p.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True when nothing has been configured.
    pub fn is_unconfigured(&self) -> bool {
        *self == TlsOpts::default()
    }

    pub(crate) fn try_copy(&self) -> Result<Self, AllocationError> {
        Ok(Self {
            mode: self.mode,
            tls: dup_opt(self.tls.as_deref())?,
            ca_file: dup_opt(self.ca_file.as_deref())?,
            cert_file: dup_opt(self.cert_file.as_deref())?,
            key_file: dup_opt(self.key_file.as_deref())?,
            protocols: dup_opt(self.protocols.as_deref())?,
        })
    }
}
