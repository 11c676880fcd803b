use serde::Deserialize;
use serde_json::Value;

use crate::error::WebhookError;
use crate::models::membership::Role;

// json format

#[derive(Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
pub struct OrganizationData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct OrganizationRef {
    pub id: String,
}

#[derive(Deserialize)]
pub struct PublicUserData {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct MembershipData {
    pub organization: OrganizationRef,
    #[serde(default)]
    pub public_user_data: Option<PublicUserData>,
    #[serde(default)]
    pub role: Option<String>,
}

// events

/// A provider event this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    OrganizationCreated { id: String, name: String },
    OrganizationUpdated { id: String, name: String },
    OrganizationDeleted { id: String },
    MembershipUpserted { workspace_id: String, user_id: String, role: Role },
    MembershipDeleted { workspace_id: String, user_id: String },
}

impl ProviderEvent {
    /// `Ok(None)` for event kinds that are acknowledged and ignored.
    pub fn parse(envelope: WebhookEnvelope) -> Result<Option<Self>, WebhookError> {
        let kind = envelope.kind.as_str();
        let event = match kind {
            "organization.created" | "organization.updated" => {
                let org: OrganizationData = from_data(envelope.data)?;
                let name = org
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| WebhookError::MissingField {
                        kind: kind.to_string(),
                        field: "a name",
                    })?;
                if kind == "organization.created" {
                    ProviderEvent::OrganizationCreated { id: org.id, name }
                } else {
                    ProviderEvent::OrganizationUpdated { id: org.id, name }
                }
            }
            "organization.deleted" => {
                let org: OrganizationData = from_data(envelope.data)?;
                ProviderEvent::OrganizationDeleted { id: org.id }
            }
            "organizationMembership.created"
            | "organizationMembership.updated"
            | "membership.created"
            | "membership.updated" => {
                let (workspace_id, user_id, role) = membership_parts(kind, envelope.data)?;
                ProviderEvent::MembershipUpserted {
                    workspace_id,
                    user_id,
                    role: Role::from_provider(&role),
                }
            }
            "organizationMembership.deleted" | "membership.deleted" => {
                let (workspace_id, user_id, _) = membership_parts(kind, envelope.data)?;
                ProviderEvent::MembershipDeleted { workspace_id, user_id }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn from_data<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, WebhookError> {
    serde_json::from_value(data).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}

fn membership_parts(kind: &str, data: Value) -> Result<(String, String, String), WebhookError> {
    let membership: MembershipData = from_data(data)?;
    let user_id = membership
        .public_user_data
        .map(|u| u.user_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WebhookError::MissingField {
            kind: kind.to_string(),
            field: "a user id",
        })?;
    Ok((membership.organization.id, user_id, membership.role.unwrap_or_default()))
}
