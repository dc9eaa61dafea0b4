use std::sync::Arc;

use tracing::info;

use crate::{
    Error, Result,
    store::ApprovalStore,
    types::UserId,
};

/// Administrator approval flags plus the super-administrator identity that
/// is allowed to set them.
pub struct ApprovalRegistry {
    store: Arc<dyn ApprovalStore>,
    super_admin: UserId,
}

impl ApprovalRegistry {
    pub fn new(store: Arc<dyn ApprovalStore>, super_admin: UserId) -> Self {
        Self { store, super_admin }
    }

    pub fn super_admin(&self) -> UserId {
        self.super_admin
    }

    pub fn is_super_admin(&self, id: UserId) -> bool {
        id == self.super_admin
    }

    /// Record a pending request. An existing record, including an approved
    /// one, is left as it is.
    pub async fn request_approval(&self, requester: UserId, username: Option<&str>) -> Result<()> {
        self.store.insert_pending(requester, username).await?;
        info!(admin_id = requester.0, username = ?username, "approval requested");
        Ok(())
    }

    /// Approve `target` on behalf of `actor`.
    ///
    /// Only the super-administrator may approve; the target must parse as a
    /// user id. Returns the approved identity.
    pub async fn approve(&self, actor: UserId, target: &str) -> Result<UserId> {
        if !self.is_super_admin(actor) {
            return Err(Error::permission_denied(format!(
                "{actor} is not the super-administrator"
            )));
        }
        let target: UserId = target.parse()?;
        self.store.set_approved(target).await?;
        info!(admin_id = target.0, "administrator approved");
        Ok(target)
    }

    pub async fn is_approved(&self, id: UserId) -> Result<bool> {
        self.store.is_approved(id).await
    }
}
