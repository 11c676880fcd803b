use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{error, info, warn};

use super::webhooks_models::{ProviderEvent, WebhookEnvelope};
use super::webhooks_signature::{
    SignatureHeaders, WebhookVerifier, HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
use crate::blob::BlobStore;
use crate::error::{ApiError, StoreError, WebhookError};
use crate::store::TaskHubStore;

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

// Handler to receive identity-provider events
pub async fn receive_event(
    store: web::Data<dyn TaskHubStore>,
    blobs: web::Data<BlobStore>,
    verifier: web::Data<WebhookVerifier>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let (Some(id), Some(timestamp), Some(signature)) = (
        header(&req, HEADER_ID),
        header(&req, HEADER_TIMESTAMP),
        header(&req, HEADER_SIGNATURE),
    ) else {
        info!("Webhook rejected: missing signature headers");
        return Err(ApiError::InvalidSignature("missing signature headers".to_string()));
    };

    let headers = SignatureHeaders { id, timestamp, signature };
    verifier
        .verify(headers, &body, Utc::now().timestamp())
        .map_err(|e| {
            warn!("Webhook {} failed verification: {}", id, e);
            ApiError::from(e)
        })?;

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
    let kind = envelope.kind.clone();
    info!("Received webhook {} of type {}", id, kind);

    let event = match ProviderEvent::parse(envelope)? {
        Some(event) => event,
        None => {
            info!("Unhandled webhook type: {}", kind);
            return Ok(HttpResponse::Ok().finish());
        }
    };

    apply_event(store.get_ref(), &blobs, event).await.map_err(|e| {
        error!("Error processing webhook {}: {}", kind, e);
        ApiError::Internal(format!("webhook {} failed", kind))
    })?;

    Ok(HttpResponse::Ok().finish())
}

/// Every branch can be re-applied without error.
async fn apply_event(store: &dyn TaskHubStore, blobs: &BlobStore, event: ProviderEvent) -> Result<(), StoreError> {
    match event {
        ProviderEvent::OrganizationCreated { id, name } | ProviderEvent::OrganizationUpdated { id, name } => {
            store.upsert_workspace(&id, &name).await?;
            info!("Workspace synced: {}", id);
        }
        ProviderEvent::OrganizationDeleted { id } => match store.delete_workspace(&id).await? {
            Some(attachments) => {
                for attachment in &attachments {
                    blobs.remove_best_effort(&attachment.file_url).await;
                }
                info!("Workspace deleted: {}", id);
            }
            None => info!("Workspace {} already gone", id),
        },
        ProviderEvent::MembershipUpserted { workspace_id, user_id, role } => {
            store.upsert_membership(&workspace_id, &user_id, role).await?;
            info!("Membership synced: {} in {} as {}", user_id, workspace_id, role);
        }
        ProviderEvent::MembershipDeleted { workspace_id, user_id } => {
            if store.delete_membership(&workspace_id, &user_id).await? {
                info!("Membership deleted: {} from {}", user_id, workspace_id);
            } else {
                info!("Membership {} in {} already gone", user_id, workspace_id);
            }
        }
    }
    Ok(())
}
