//! URL builders for the autoscaling policy API.
//!
//! Every policy URL lives under `{endpoint}{project_id}/scaling_policy`.

use super::ServiceClient;

const RESOURCE_PATH: &str = "scaling_policy";

/// URL for creating a policy: `{endpoint}{project_id}/scaling_policy`.
pub fn create_url(client: &ServiceClient) -> String {
    client.service_url(&[client.project_id.as_str(), RESOURCE_PATH])
}

/// URL for deleting a policy: `{endpoint}{project_id}/scaling_policy/{id}`.
pub fn delete_url(client: &ServiceClient, id: &str) -> String {
    policy_url(client, id)
}

/// URL for fetching a policy.
pub fn get_url(client: &ServiceClient, id: &str) -> String {
    policy_url(client, id)
}

/// URL for updating a policy.
pub fn update_url(client: &ServiceClient, id: &str) -> String {
    policy_url(client, id)
}

fn policy_url(client: &ServiceClient, id: &str) -> String {
    client.service_url(&[client.project_id.as_str(), RESOURCE_PATH, id])
}
