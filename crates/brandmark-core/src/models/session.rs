use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role of the authenticated user within their organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Member,
    Viewer,
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Member => write!(f, "member"),
            UserRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" | "administrator" => Ok(UserRole::Admin),
            "member" => Ok(UserRole::Member),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(AppError::Unauthenticated(format!("Unknown role: {}", other))),
        }
    }
}

/// The authenticated caller, passed explicitly to the ticket issuer and the
/// finalization committer instead of being read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: UserRole,
}

impl SessionContext {
    pub fn new(user_id: Uuid, organization_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            organization_id,
            role,
        }
    }

    /// Only administrators of the owning organization may change its settings.
    pub fn can_administer(&self, owner_id: Uuid) -> bool {
        self.organization_id == owner_id && self.role == UserRole::Admin
    }

    pub fn ensure_can_administer(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.can_administer(owner_id) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "User {} may not change settings of organization {}",
                self.user_id, owner_id
            )))
        }
    }

    /// Any member of the organization may read its settings.
    pub fn ensure_member_of(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.organization_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "User {} is not a member of organization {}",
                self.user_id, owner_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_of_other_org_cannot_administer() {
        let org = Uuid::new_v4();
        let session = SessionContext::new(Uuid::new_v4(), org, UserRole::Admin);
        assert!(session.can_administer(org));
        assert!(!session.can_administer(Uuid::new_v4()));
        assert!(matches!(
            session.ensure_can_administer(Uuid::new_v4()),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn member_can_read_but_not_administer() {
        let org = Uuid::new_v4();
        let session = SessionContext::new(Uuid::new_v4(), org, UserRole::Member);
        assert!(session.ensure_member_of(org).is_ok());
        assert!(session.ensure_can_administer(org).is_err());
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Administrator".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("viewer".parse::<UserRole>().unwrap(), UserRole::Viewer);
        assert!("owner".parse::<UserRole>().is_err());
    }
}
