//! Provider configuration.
//!
//! The host hands the provider block to [`ProviderService::configure`] as a
//! JSON object. It is parsed into a [`ProviderConfig`], with the usual
//! OpenStack environment variables filling in anything left out.
//!
//! [`ProviderService::configure`]: crate::service::ProviderService::configure

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `region` is not configured.
pub const ENV_REGION: &str = "OS_REGION_NAME";
/// Environment variable consulted when `project_id` is not configured.
pub const ENV_PROJECT_ID: &str = "OS_PROJECT_ID";
/// Environment variable consulted when `auth_token` is not configured.
pub const ENV_AUTH_TOKEN: &str = "OS_AUTH_TOKEN";

fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

fn default_cloud() -> String {
    "telefonicaopencloud.com".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_create_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_update_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_delete_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

/// The mutating lifecycle phases that carry a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Creating a new entity.
    Create,
    /// Updating an existing entity in place.
    Update,
    /// Deleting an entity.
    Delete,
}

/// Wall-clock deadline per lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceTimeouts {
    /// Deadline for create (seconds in configuration).
    #[serde(
        rename = "create_secs",
        default = "default_create_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub create: Duration,
    /// Deadline for update (seconds in configuration).
    #[serde(
        rename = "update_secs",
        default = "default_update_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub update: Duration,
    /// Deadline for delete (seconds in configuration).
    #[serde(
        rename = "delete_secs",
        default = "default_delete_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub delete: Duration,
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self {
            create: default_create_timeout(),
            update: default_update_timeout(),
            delete: default_delete_timeout(),
        }
    }
}

impl ResourceTimeouts {
    /// The deadline for a lifecycle phase.
    pub fn for_phase(&self, phase: LifecyclePhase) -> Duration {
        match phase {
            LifecyclePhase::Create => self.create,
            LifecyclePhase::Update => self.update,
            LifecyclePhase::Delete => self.delete,
        }
    }
}

/// Provider-wide configuration, read-only once configured.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    /// Region the Cloud Eye client is scoped to.
    #[serde(default)]
    pub region: Option<String>,
    /// Project (tenant) id used in every request path.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Pre-issued token sent as `X-Auth-Token`.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Cloud domain used to derive service endpoints.
    #[serde(default = "default_cloud")]
    pub cloud: String,
    /// Explicit Cloud Eye endpoint, overriding the derived one.
    #[serde(default)]
    pub ces_endpoint: Option<String>,
    /// Per-request HTTP timeout (seconds in configuration).
    #[serde(
        rename = "request_timeout_secs",
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub request_timeout: Duration,
    /// Lifecycle deadlines.
    #[serde(default)]
    pub timeouts: ResourceTimeouts,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("cloud", &self.cloud)
            .field("ces_endpoint", &self.ces_endpoint)
            .field("request_timeout", &self.request_timeout)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: None,
            project_id: None,
            auth_token: None,
            cloud: default_cloud(),
            ces_endpoint: None,
            request_timeout: default_request_timeout(),
            timeouts: ResourceTimeouts::default(),
        }
    }
}

impl ProviderConfig {
    /// Parse the provider block, treating `null` as an empty block.
    ///
    /// Does not consult the environment; see [`ProviderConfig::with_env_fallback`].
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Configuration(format!("invalid provider config: {}", e)))
    }

    /// Fill unset credentials and scope from the environment.
    pub fn with_env_fallback(mut self) -> Self {
        fn env(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }
        if self.region.is_none() {
            self.region = env(ENV_REGION);
        }
        if self.project_id.is_none() {
            self.project_id = env(ENV_PROJECT_ID);
        }
        if self.auth_token.is_none() {
            self.auth_token = env(ENV_AUTH_TOKEN);
        }
        self
    }

    /// Check that the configuration can produce a scoped client.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let missing = [
            ("region", self.region.is_none(), ENV_REGION),
            ("project_id", self.project_id.is_none(), ENV_PROJECT_ID),
            ("auth_token", self.auth_token.is_none(), ENV_AUTH_TOKEN),
        ];
        for (name, is_missing, env) in missing {
            if is_missing {
                diagnostics.push(
                    Diagnostic::error(format!("Missing provider setting '{}'", name))
                        .with_detail(format!("Set '{}' or the {} environment variable", name, env))
                        .with_attribute(name),
                );
            }
        }

        if let Some(endpoint) = &self.ces_endpoint {
            if let Err(e) = Url::parse(endpoint) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid ces_endpoint '{}'", endpoint))
                        .with_detail(e.to_string())
                        .with_attribute("ces_endpoint"),
                );
            }
        }

        diagnostics
    }

    /// The Cloud Eye endpoint, always ending in `/`.
    pub fn ces_endpoint(&self) -> Result<String, ProviderError> {
        let endpoint = match (&self.ces_endpoint, &self.region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => format!("https://ces.{}.{}/V1.0/", region, self.cloud),
            (None, None) => {
                return Err(ProviderError::Configuration(
                    "region is required to derive the Cloud Eye endpoint".to_string(),
                ))
            },
        };
        let url = Url::parse(&endpoint).map_err(|e| {
            ProviderError::Configuration(format!("invalid Cloud Eye endpoint '{}': {}", endpoint, e))
        })?;
        let mut endpoint = url.to_string();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        Ok(endpoint)
    }

    /// The configured project id.
    pub fn require_project_id(&self) -> Result<&str, ProviderError> {
        self.project_id
            .as_deref()
            .ok_or_else(|| ProviderError::Configuration("project_id is not configured".to_string()))
    }

    /// The configured auth token.
    pub fn require_auth_token(&self) -> Result<&str, ProviderError> {
        self.auth_token
            .as_deref()
            .ok_or_else(|| ProviderError::Configuration("auth_token is not configured".to_string()))
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "region",
                Attribute::optional_string().with_description("Region to manage resources in"),
            )
            .with_attribute(
                "project_id",
                Attribute::optional_string().with_description("Project (tenant) id"),
            )
            .with_attribute(
                "auth_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Pre-issued token sent as X-Auth-Token"),
            )
            .with_attribute(
                "cloud",
                Attribute::optional_string()
                    .with_default(Value::String(default_cloud()))
                    .with_description("Cloud domain used to derive service endpoints"),
            )
            .with_attribute(
                "ces_endpoint",
                Attribute::optional_string().with_description("Explicit Cloud Eye endpoint"),
            )
            .with_attribute(
                "request_timeout_secs",
                Attribute::optional_int64().with_description("Per-request HTTP timeout"),
            )
    }
}
