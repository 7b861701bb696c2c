use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullName {
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
}

/// Request body for registration. Fields are defaulted so that absent ones
/// surface as a 400 with the API's own message instead of a serde reject.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub fullname: Option<FullName>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public part of a user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub fullname: FullName,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            fullname: FullName {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
            },
            role: user.role,
        }
    }
}

/// Response returned after register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: Some("test@example.com".into()),
            first_name: "Test".into(),
            last_name: "User".into(),
            password_hash: Some("hash".into()),
            google_id: None,
            role: Role::User,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn public_user_has_no_password_field() {
        let json = serde_json::to_value(PublicUser::from(&sample_user())).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["fullname"]["firstName"], "Test");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn missing_fullname_deserializes_as_none() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"secret1"}"#).unwrap();
        assert!(req.fullname.is_none());
        assert_eq!(req.email, "a@x.com");
    }

    #[test]
    fn absent_credentials_default_to_empty() {
        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }
}
