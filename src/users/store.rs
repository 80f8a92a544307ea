//! The credential store boundary.
//!
//! Everything the session layer needs from persistence, as one trait.
//! The production implementation is MongoDB (`MongoStore`); the
//! integration suite substitutes an in-memory implementation.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::AppError;
use crate::users::model::{NewUser, ProfileUpdate, User};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account whose username or email equals the given,
    /// already-normalized values.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Look up an account by a single login identifier, matched against
    /// both username and email.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, AppError>;

    /// Create an account. Fails with a conflict when username or email is
    /// already taken; uniqueness is enforced at the store level.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Apply a partial profile update and return the updated record, or
    /// `None` when the account does not exist.
    async fn update_fields(
        &self,
        id: ObjectId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError>;

    async fn set_password_hash(&self, id: ObjectId, password_hash: &str)
        -> Result<(), AppError>;

    /// Persist the current refresh token (login) or clear it (logout).
    async fn set_refresh_token(
        &self,
        id: ObjectId,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError>;

    /// Atomically replace the stored refresh token with `next`, but only if
    /// it still equals `current`. Returns `false` when the stored value no
    /// longer matches, which is how reuse of a superseded token is
    /// detected. Two racing refreshes with the same token cannot both
    /// succeed.
    async fn rotate_refresh_token(
        &self,
        id: ObjectId,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError>;
}
