//! Immutable per-account record.
//!
//! A `Profile` bundles everything one pipeline invocation needs: identifier,
//! Discord token, raw proxy descriptor, and outbound user-agent. Required
//! fields are checked once at construction instead of optimistically at every
//! use site.

use anyhow::{bail, Result};

/// One account to process. Built once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub identifier: String,
    pub token: String,
    /// May be empty; the API client falls back to a default user-agent.
    pub user_agent: String,
    /// Raw proxy descriptor (`host:port` or `host:port:user:pass`), may be
    /// empty for a direct connection.
    pub proxy: String,
}

impl Profile {
    pub fn new(
        identifier: impl Into<String>,
        token: impl Into<String>,
        user_agent: impl Into<String>,
        proxy: impl Into<String>,
    ) -> Result<Self> {
        let identifier = identifier.into();
        let token = token.into();
        if token.trim().is_empty() {
            bail!("profile {identifier}: Discord token missing");
        }
        Ok(Self {
            identifier,
            token,
            user_agent: user_agent.into(),
            proxy: proxy.into(),
        })
    }

    /// Numeric profile number used for sorting and the leave ledger.
    /// Non-numeric identifiers collapse to 0.
    pub fn number(&self) -> u32 {
        self.identifier.parse().unwrap_or(0)
    }
}
