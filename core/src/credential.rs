//! API key validation.
//!
//! A key has the shape `<secret>-<region>`, where the region is a shard
//! code such as `us6`. The region selects the host every request goes to,
//! so a malformed key is rejected before any network call.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ChimpError, Result};

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*-[a-z]{2}[0-9]+$").expect("static regex compiles")
});

/// A validated API key split into its secret and region parts.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    region: String,
}

impl Credential {
    /// Validate `raw` and split it on its final hyphen.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = raw.unwrap_or_default();
        let Some((secret, region)) = raw.rsplit_once('-').filter(|_| KEY_PATTERN.is_match(raw)) else {
            return Err(ChimpError::InvalidCredential {
                raw: raw.to_string(),
            });
        };

        Ok(Self {
            secret: secret.to_string(),
            region: region.to_string(),
        })
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Host serving this key's shard, e.g. `us6.api.mailchimp.com`.
    pub fn host(&self, domain: &str) -> String {
        format!("{}.api.{domain}", self.region)
    }
}

impl FromStr for Credential {
    type Err = ChimpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(Some(s))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}
