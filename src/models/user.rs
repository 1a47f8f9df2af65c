use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, spec::BinarySubtype, Binary};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::codec::{compress_json, decompress_json};
use crate::utils::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// Account data. Persisted as a compressed JSON blob inside [`UserRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    /// bcrypt hash; absent for Google-only accounts
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub is_google_auth: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub verification_code_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub reset_token_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Google account that never set a local password.
    pub fn is_google_only(&self) -> bool {
        self.is_google_auth && self.password.is_none()
    }

    pub fn info(&self) -> UserInfo {
        UserInfo {
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
            is_google_auth: self.is_google_auth,
            role: self.role,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
            is_google_auth: self.is_google_auth,
            role: self.role,
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }

    pub fn to_record(&self) -> AppResult<UserRecord> {
        Ok(UserRecord {
            id: None,
            email: self.email.clone(),
            data: Binary {
                subtype: BinarySubtype::Generic,
                bytes: compress_json(self)?,
            },
        })
    }
}

/// Document stored in the `USER` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub data: Binary,
}

impl UserRecord {
    pub fn user(&self) -> AppResult<User> {
        decompress_json(&self.data.bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub is_google_auth: bool,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub is_google_auth: bool,
    pub role: UserRole,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// What administrators see: everything but secrets.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
    pub google_id: Option<String>,
    pub picture: Option<String>,
    pub is_google_auth: bool,
    pub email_verified: bool,
    pub verification_code_expires: Option<DateTime<Utc>>,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for AdminUserView {
    fn from(user: User) -> Self {
        AdminUserView {
            name: user.name,
            email: user.email,
            google_id: user.google_id,
            picture: user.picture,
            is_google_auth: user.is_google_auth,
            email_verified: user.email_verified,
            verification_code_expires: user.verification_code_expires,
            role: user.role,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password: Some("$2b$12$hash".into()),
            verification_code: Some("123456".into()),
            reset_token: Some("reset".into()),
            created_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    #[test]
    fn record_keeps_email_outside_the_blob() {
        let record = sample().to_record().unwrap();
        assert_eq!(record.email, "jane@example.com");
        assert!(record.id.is_none());

        let user = record.user().unwrap();
        assert_eq!(user.name, "Jane");
        assert_eq!(user.verification_code.as_deref(), Some("123456"));
    }

    #[test]
    fn reads_documents_written_by_older_deployments() {
        // Older writers stored naive ISO strings with offsets and no role field.
        let legacy = serde_json::json!({
            "name": "Legacy",
            "email": "legacy@example.com",
            "password": "$2b$12$abc",
            "email_verified": true,
            "created_at": "2024-03-15T10:20:30.123456+00:00",
            "verification_code": null,
            "verification_code_expires": null
        });
        let bytes = compress_json(&legacy).unwrap();
        let user: User = decompress_json(&bytes).unwrap();

        assert_eq!(user.role, UserRole::User);
        assert!(user.email_verified);
        assert!(user.created_at.is_some());
        assert!(!user.is_google_only());
    }

    #[test]
    fn admin_view_drops_secrets() {
        let json = serde_json::to_value(AdminUserView::from(sample())).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("verification_code").is_none());
        assert!(json.get("reset_token").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn google_only_means_no_password() {
        let mut user = sample();
        user.is_google_auth = true;
        assert!(!user.is_google_only());
        user.password = None;
        assert!(user.is_google_only());
    }
}
