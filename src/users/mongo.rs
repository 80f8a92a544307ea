//! MongoDB-backed credential store.

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

use crate::configuration::DatabaseSettings;
use crate::error::AppError;
use crate::users::model::{NewUser, ProfileUpdate, User};
use crate::users::store::CredentialStore;

#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
}

impl MongoStore {
    /// Connect and prepare the `users` collection, including the unique
    /// indexes that make username/email uniqueness a store-level guarantee.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, AppError> {
        let client = Client::with_uri_str(&settings.uri).await?;
        let users = client
            .database(&settings.database_name)
            .collection::<User>("users");

        let store = Self { users };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), AppError> {
        for field in ["username", "email"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.users.create_index(index, None).await?;
        }
        Ok(())
    }

    fn touch(set: &mut Document) {
        set.insert("updated_at", BsonDateTime::from_chrono(Utc::now()));
    }
}

#[async_trait]
impl CredentialStore for MongoStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let filter = doc! { "$or": [ { "username": username }, { "email": email } ] };
        Ok(self.users.find_one(filter, None).await?)
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let filter = doc! { "$or": [ { "username": identifier }, { "email": identifier } ] };
        Ok(self.users.find_one(filter, None).await?)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = User {
            id: ObjectId::new(),
            username: new_user.username,
            email: new_user.email,
            fullname: new_user.fullname,
            password_hash: new_user.password_hash,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        // Duplicate-key writes (E11000) surface as a conflict
        self.users.insert_one(&user, None).await?;
        Ok(user)
    }

    async fn update_fields(
        &self,
        id: ObjectId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut set = Document::new();
        if let Some(fullname) = &update.fullname {
            set.insert("fullname", fullname);
        }
        if let Some(email) = &update.email {
            set.insert("email", email);
        }
        if let Some(avatar) = &update.avatar {
            set.insert("avatar", avatar);
        }
        if let Some(cover_image) = &update.cover_image {
            set.insert("cover_image", cover_image);
        }
        Self::touch(&mut set);

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .users
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await?;
        Ok(updated)
    }

    async fn set_password_hash(
        &self,
        id: ObjectId,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let mut set = doc! { "password_hash": password_hash };
        Self::touch(&mut set);
        self.users
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await?;
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        id: ObjectId,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        let value = match refresh_token {
            Some(token) => Bson::String(token.to_string()),
            None => Bson::Null,
        };
        let mut set = doc! { "refresh_token": value };
        Self::touch(&mut set);
        self.users
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: ObjectId,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        // Compare-and-swap: the filter matches only while the stored token
        // still equals `current`, so concurrent refreshes with the same
        // token cannot both succeed.
        let mut set = doc! { "refresh_token": next };
        Self::touch(&mut set);
        let updated = self
            .users
            .find_one_and_update(
                doc! { "_id": id, "refresh_token": current },
                doc! { "$set": set },
                None,
            )
            .await?;
        Ok(updated.is_some())
    }
}
