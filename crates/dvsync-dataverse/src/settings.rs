//! Dataverse connection settings

use std::fmt;

pub const ORG_URL_ENV: &str = "DV_ORG_URL";
pub const CLIENT_ID_ENV: &str = "DV_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "DV_CLIENT_SECRET";
pub const TENANT_ID_ENV: &str = "DV_TENANT_ID";

/// Credentials for an app registration using the client-credentials flow
///
/// Every field is optional so partially configured environments can still
/// produce an analysis; `is_configured` decides whether the remote platform
/// is contacted at all.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub org_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
}

impl ConnectionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `DV_*` environment variables
    pub fn from_env() -> Self {
        Self {
            org_url: std::env::var(ORG_URL_ENV).ok(),
            client_id: std::env::var(CLIENT_ID_ENV).ok(),
            client_secret: std::env::var(CLIENT_SECRET_ENV).ok(),
            tenant_id: std::env::var(TENANT_ID_ENV).ok(),
        }
    }

    pub fn with_org_url(mut self, org_url: impl Into<String>) -> Self {
        self.org_url = Some(org_url.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: ConnectionSettings) -> Self {
        Self {
            org_url: present(self.org_url).or(present(fallback.org_url)),
            client_id: present(self.client_id).or(present(fallback.client_id)),
            client_secret: present(self.client_secret).or(present(fallback.client_secret)),
            tenant_id: present(self.tenant_id).or(present(fallback.tenant_id)),
        }
    }

    /// Names of the environment variables whose values are missing or blank
    pub fn missing_variables(&self) -> Vec<&'static str> {
        [
            (ORG_URL_ENV, &self.org_url),
            (CLIENT_ID_ENV, &self.client_id),
            (CLIENT_SECRET_ENV, &self.client_secret),
            (TENANT_ID_ENV, &self.tenant_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_configured(&self) -> bool {
        self.missing_variables().is_empty()
    }

    /// Organization URL without a trailing slash
    pub fn base_url(&self) -> Option<String> {
        self.org_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("org_url", &self.org_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}
