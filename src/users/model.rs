//! Account documents and their public projection.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// One account record as persisted in the `users` collection.
///
/// Invariants: `password_hash` is never empty; `refresh_token` is either
/// `None` or exactly the last refresh token issued for this account (at
/// most one valid refresh token per account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Unique, lowercased and trimmed before write
    pub username: String,
    /// Unique, lowercased and trimmed before write
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
    /// Hosted avatar URL, required at registration
    pub avatar: String,
    pub cover_image: Option<String>,
    /// The single current refresh token, or None when logged out
    pub refresh_token: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an account. Text fields are expected to be
/// validated and normalized already.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Partial update applied by explicit profile-edit operations.
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.cover_image.is_none()
    }
}

/// The only account shape that ever leaves the process: everything except
/// the password hash and the stored refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: ObjectId::new(),
            username: "janed".to_string(),
            email: "jane@x.com".to_string(),
            fullname: "Jane Doe".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            avatar: "https://media.test/a.png".to_string(),
            cover_image: Some("https://media.test/c.png".to_string()),
            refresh_token: Some("some.refresh.token".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn profile_excludes_secrets() {
        let profile = UserProfile::from(sample_user());
        let json = serde_json::to_value(&profile).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["username"], "janed");
        assert_eq!(json["cover_image"], "https://media.test/c.png");
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            fullname: Some("Jane".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
