//! Authorization gate: decides whether a caller may act on a workspace.
//!
//! Two ownership models coexist. A personal workspace (`user_<id>`) belongs
//! to that user with no membership row; any other workspace is shared and
//! access comes from the caller's membership. Callers without access get
//! `NotFound` so workspace existence does not leak; members lacking the
//! ADMIN role get `Forbidden`.

use log::info;

use super::Caller;
use crate::error::ApiError;
use crate::models::membership::Role;
use crate::models::workspace::PERSONAL_WORKSPACE_PREFIX;
use crate::store::TaskHubStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner<'a> {
    /// Personal workspace of the given user id.
    Personal(&'a str),
    /// Membership-based workspace.
    Shared(&'a str),
}

impl<'a> Owner<'a> {
    pub fn resolve(workspace_id: &'a str) -> Self {
        match workspace_id.strip_prefix(PERSONAL_WORKSPACE_PREFIX) {
            Some(user_id) if !user_id.is_empty() => Owner::Personal(user_id),
            _ => Owner::Shared(workspace_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any membership suffices.
    Member,
    /// Membership with the ADMIN role.
    Admin,
}

/// Granted access to one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub workspace_id: String,
    pub role: Role,
    pub personal: bool,
}

pub async fn authorize(
    store: &dyn TaskHubStore,
    caller: &Caller,
    workspace_id: &str,
    policy: Policy,
) -> Result<Access, ApiError> {
    let role = match Owner::resolve(workspace_id) {
        Owner::Personal(owner) => {
            if owner != caller.user_id {
                info!("User {} denied access to personal workspace {}", caller.user_id, workspace_id);
                return Err(ApiError::not_found("Workspace"));
            }
            return Ok(Access {
                workspace_id: workspace_id.to_string(),
                role: Role::Admin,
                personal: true,
            });
        }
        Owner::Shared(id) => match store.find_membership(id, &caller.user_id).await? {
            Some(member) => member.role,
            None => {
                info!("User {} is not a member of workspace {}", caller.user_id, workspace_id);
                return Err(ApiError::not_found("Workspace"));
            }
        },
    };

    if policy == Policy::Admin && role != Role::Admin {
        info!("User {} lacks admin role on workspace {}", caller.user_id, workspace_id);
        return Err(ApiError::Forbidden("Admin role required".to_string()));
    }

    Ok(Access {
        workspace_id: workspace_id.to_string(),
        role,
        personal: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn caller(id: &str) -> Caller {
        Caller { user_id: id.to_string() }
    }

    #[test]
    fn resolves_personal_and_shared_ids() {
        assert_eq!(Owner::resolve("user_abc"), Owner::Personal("abc"));
        assert_eq!(Owner::resolve("org_abc"), Owner::Shared("org_abc"));
        assert_eq!(Owner::resolve("user_"), Owner::Shared("user_"));
    }

    #[tokio::test]
    async fn personal_workspace_belongs_to_its_user_only() {
        let store = MemoryStore::new();
        let access = authorize(&store, &caller("u1"), "user_u1", Policy::Admin).await.unwrap();
        assert!(access.personal);

        let err = authorize(&store, &caller("u2"), "user_u1", Policy::Member).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn shared_workspace_roles() {
        let store = MemoryStore::new();
        store.create_workspace("org_1", "Team", "admin").await.unwrap();
        store.add_membership("org_1", "member", Role::Member).await.unwrap();

        authorize(&store, &caller("admin"), "org_1", Policy::Admin).await.unwrap();
        authorize(&store, &caller("member"), "org_1", Policy::Member).await.unwrap();

        let err = authorize(&store, &caller("member"), "org_1", Policy::Admin).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = authorize(&store, &caller("stranger"), "org_1", Policy::Member).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
