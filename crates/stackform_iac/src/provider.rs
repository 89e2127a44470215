//! Terraform provider definitions.

use serde::{Deserialize, Serialize};

/// Providers resources can be declared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aiven,
    Google,
    Cloudflare,
}

impl Provider {
    /// Local provider name used in `required_providers`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aiven => "aiven",
            Provider::Google => "google",
            Provider::Cloudflare => "cloudflare",
        }
    }

    /// Registry source address.
    pub fn source(&self) -> &'static str {
        match self {
            Provider::Aiven => "aiven/aiven",
            Provider::Google => "hashicorp/google",
            Provider::Cloudflare => "cloudflare/cloudflare",
        }
    }

    /// Version constraint for the provider.
    pub fn version(&self) -> &'static str {
        match self {
            Provider::Aiven => "~> 4.0",
            Provider::Google => "~> 5.0",
            Provider::Cloudflare => "~> 4.0",
        }
    }

    /// Environment variable the provider reads credentials from.
    pub fn credentials_env(&self) -> &'static str {
        match self {
            Provider::Aiven => "AIVEN_TOKEN",
            Provider::Google => "GOOGLE_CREDENTIALS",
            Provider::Cloudflare => "CLOUDFLARE_API_TOKEN",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Provider::Aiven, Provider::Google, Provider::Cloudflare]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
