use crate::auth::{authorize, Access, Caller, Policy};
use crate::error::ApiError;
use crate::models::workspace::{personal_workspace_id, PERSONAL_WORKSPACE_NAME};
use crate::store::TaskHubStore;

/// Authorizes the caller on `requested` (their personal workspace when
/// `None`) and provisions the personal workspace row on first use.
pub async fn workspace_access(
    store: &dyn TaskHubStore,
    caller: &Caller,
    requested: Option<&str>,
    policy: Policy,
) -> Result<Access, ApiError> {
    let workspace_id = match requested.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => personal_workspace_id(&caller.user_id),
    };
    let access = authorize(store, caller, &workspace_id, policy).await?;
    if access.personal {
        store
            .get_or_create_workspace(&access.workspace_id, PERSONAL_WORKSPACE_NAME)
            .await?;
    }
    Ok(access)
}
