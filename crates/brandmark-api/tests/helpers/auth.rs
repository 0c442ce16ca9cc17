use super::TestApp;
use brandmark_core::models::{SessionContext, UserRole};
use uuid::Uuid;

/// A signed-in user of one organization
pub struct TestUser {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Sign a session token for a fresh user of `organization_id` with `role`.
pub fn login_as(app: &TestApp, organization_id: Uuid, role: UserRole) -> TestUser {
    let user_id = Uuid::new_v4();
    let session = SessionContext::new(user_id, organization_id, role);
    let token = app
        .jwt
        .issue(&session, 3600)
        .expect("Failed to sign test token");
    TestUser {
        organization_id,
        user_id,
        token,
    }
}

/// Administrator of a brand new organization
pub fn register_admin(app: &TestApp) -> TestUser {
    login_as(app, Uuid::new_v4(), UserRole::Admin)
}
