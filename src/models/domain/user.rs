use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl User {
    pub fn new(id: &str, username: &str, email: &str, role: UserRole) -> Self {
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            role,
            created_at: Some(Utc::now()),
        }
    }

    /// Teachers and admins manage content.
    pub fn can_manage_content(&self) -> bool {
        matches!(self.role, UserRole::Teacher | UserRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("u-1", "ada", "ada@example.com", UserRole::Teacher);
        assert_eq!(user.username, "ada");
        assert!(user.created_at.is_some());
        assert!(user.can_manage_content());
    }

    #[test]
    fn test_role_defaults_to_student() {
        let user: User =
            serde_json::from_str(r#"{"id":"u-2","username":"bo","email":"bo@example.com"}"#)
                .expect("user should parse");
        assert_eq!(user.role, UserRole::Student);
        assert!(!user.can_manage_content());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&UserRole::Admin).expect("role should serialize");
        assert_eq!(json, "\"admin\"");
    }
}
