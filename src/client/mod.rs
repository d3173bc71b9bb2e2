//! REST clients for the services this provider talks to.
//!
//! - [`http`]: authenticated JSON transport and status mapping
//! - [`alarmrule`]: Cloud Eye alarm-rule API
//! - [`autoscaling`]: URL builders for the autoscaling policy API

pub mod alarmrule;
pub mod autoscaling;
pub mod http;

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

pub use alarmrule::{AlarmRuleApi, CesClient};
pub use http::HttpClient;

/// A service endpoint scoped to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceClient {
    /// Base URL of the service, always ending in `/`.
    pub endpoint: String,
    /// Project (tenant) id.
    pub project_id: String,
}

impl ServiceClient {
    /// Create a service client. A trailing `/` is added to the endpoint if missing.
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        Self {
            endpoint,
            project_id: project_id.into(),
        }
    }

    /// Join `parts` with `/` onto the endpoint.
    pub fn service_url(&self, parts: &[&str]) -> String {
        format!("{}{}", self.endpoint, parts.join("/"))
    }
}

/// Builds the remote clients used by resource operations.
///
/// A client is constructed for every operation from the configured provider
/// settings.
pub trait ClientFactory: Send + Sync {
    /// Build an alarm-rule client.
    fn alarm_rule_client(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn AlarmRuleApi>, ProviderError>;
}

/// Factory for clients that talk to the real Cloud Eye endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CesClientFactory;

impl ClientFactory for CesClientFactory {
    fn alarm_rule_client(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn AlarmRuleApi>, ProviderError> {
        Ok(Arc::new(CesClient::from_config(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_joins_parts() {
        let client = ServiceClient::new("https://as.example.com/autoscaling-api/v1", "p-1");
        assert_eq!(client.endpoint, "https://as.example.com/autoscaling-api/v1/");
        assert_eq!(
            client.service_url(&["p-1", "scaling_policy", "sp-9"]),
            "https://as.example.com/autoscaling-api/v1/p-1/scaling_policy/sp-9"
        );
        assert_eq!(client.service_url(&[]), client.endpoint);
    }

    #[test]
    fn test_factory_requires_credentials() {
        let config = ProviderConfig {
            region: Some("eu-de".to_string()),
            ..Default::default()
        };
        let err = CesClientFactory.alarm_rule_client(&config).err().unwrap();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_factory_builds_client_from_config() {
        let config = ProviderConfig {
            region: Some("eu-de".to_string()),
            project_id: Some("p-1".to_string()),
            auth_token: Some("token".to_string()),
            ..Default::default()
        };
        assert!(CesClientFactory.alarm_rule_client(&config).is_ok());
    }
}
