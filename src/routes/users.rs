//! Session controller: registration, login, logout, token refresh,
//! password change and profile updates.
//!
//! One account session moves Anonymous -> Authenticated -> Anonymous, with
//! the authenticated state refreshable in place. The refresh flow is
//! check-then-swap against the stored token, so a refresh token works
//! exactly once before being superseded.

use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::auth::{
    hash_password, issue_access_token, issue_refresh_token, verify_password,
    verify_refresh_token,
};
use crate::configuration::{JwtSettings, MediaSettings};
use crate::error::{AppError, AuthError, StoreError, ValidationError};
use crate::media::{self, MediaStore};
use crate::middleware::CurrentUser;
use crate::users::{CredentialStore, NewUser, ProfileUpdate, UserProfile};
use crate::validators::{is_valid_email, is_valid_fullname, is_valid_username};

const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenPairResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// POST /users/register (multipart)
///
/// Text fields: fullname, username, email, password.
/// File parts: avatar (required), coverImage (optional).
///
/// Responds 201 with the created profile; the password hash and refresh
/// token never appear in the response. 409 when username or email is
/// already taken (case-insensitive, and without revealing which field);
/// 400 when a field fails validation or the avatar is missing or fails
/// to upload.
pub async fn register(
    mut payload: Multipart,
    store: web::Data<dyn CredentialStore>,
    media_store: web::Data<dyn MediaStore>,
    media_settings: web::Data<MediaSettings>,
) -> Result<HttpResponse, AppError> {
    let form = RegisterForm::parse(&mut payload, Path::new(&media_settings.temp_dir)).await?;
    let spooled = form.spooled_paths();

    match register_account(form, store.get_ref(), media_store.get_ref()).await {
        Ok(profile) => {
            tracing::info!(username = %profile.username, "User registered");
            Ok(HttpResponse::Created().json(RegisterResponse {
                success: true,
                message: "User registered successfully".to_string(),
                user: profile,
            }))
        }
        Err(e) => {
            // Spooled files are deleted on every path
            for path in &spooled {
                if path.exists() {
                    media::discard(path).await;
                }
            }
            Err(e)
        }
    }
}

async fn register_account(
    form: RegisterForm,
    store: &dyn CredentialStore,
    media_store: &dyn MediaStore,
) -> Result<UserProfile, AppError> {
    let fullname = is_valid_fullname(&form.fullname)?;
    let username = is_valid_username(&form.username)?;
    let email = is_valid_email(&form.email)?;

    if store
        .find_by_username_or_email(&username, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Store(StoreError::Duplicate));
    }

    let avatar_path = form.avatar_path.ok_or_else(|| {
        AppError::Validation(ValidationError::MissingUpload("avatar".to_string()))
    })?;

    let password_hash = hash_password(&form.password)?;

    let avatar = media::upload_and_discard(media_store, &avatar_path).await?;

    // Cover image is optional and its upload failure is tolerated
    let cover_image = match form.cover_path {
        Some(path) => match media::upload_and_discard(media_store, &path).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Cover image upload failed, continuing without: {}", e);
                None
            }
        },
        None => None,
    };

    let user = store
        .create(NewUser {
            username,
            email,
            fullname,
            password_hash,
            avatar,
            cover_image,
        })
        .await?;

    Ok(UserProfile::from(user))
}

/// POST /users/login
///
/// 404 when no account matches the identifier, 401 on a wrong password.
/// On success both tokens are issued, the refresh token is persisted onto
/// the account (overwriting any prior value, which revokes the previous
/// session) and both tokens are also set as httpOnly+secure cookies.
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn CredentialStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let identifier = form.username_or_email.trim().to_lowercase();
    if identifier.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "username_or_email".to_string(),
        )));
    }

    let user = store
        .find_by_login(&identifier)
        .await?
        .ok_or_else(|| AppError::Store(StoreError::NotFound("account".to_string())))?;

    if !verify_password(&form.password, &user.password_hash)? {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let access_token = issue_access_token(&user, jwt_config.get_ref())?;
    let refresh_token = issue_refresh_token(user.id, jwt_config.get_ref())?;

    store
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie("accessToken", &access_token))
        .cookie(session_cookie("refreshToken", &refresh_token))
        .json(SessionResponse {
            success: true,
            message: "Login successful".to_string(),
            user: UserProfile::from(&user),
            access_token,
            refresh_token,
        }))
}

/// POST /users/logout (protected)
///
/// Clears the stored refresh token and expires both cookies. Idempotent.
pub async fn logout(
    current: web::ReqData<CurrentUser>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    store.set_refresh_token(current.id, None).await?;

    tracing::info!(user_id = %current.id, "User logged out");

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie("accessToken"))
        .cookie(removal_cookie("refreshToken"))
        .json(MessageResponse {
            success: true,
            message: "Logged out".to_string(),
        }))
}

/// POST /users/refresh
///
/// Token rotation. In order: verify signature and expiry with the refresh
/// secret, load the account from the embedded id, then atomically swap
/// the stored token from the incoming value to a freshly issued one. Any
/// failure along the way is a 401; a swap miss means the token was
/// already used, superseded or cleared by logout.
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    store: web::Data<dyn CredentialStore>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let incoming = req
        .cookie("refreshToken")
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let claims = verify_refresh_token(&incoming, jwt_config.get_ref())?;
    let user_id = claims.user_id()?;

    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::TokenInvalid))?;

    let access_token = issue_access_token(&user, jwt_config.get_ref())?;
    let refresh_token = issue_refresh_token(user.id, jwt_config.get_ref())?;

    let rotated = store
        .rotate_refresh_token(user.id, &incoming, &refresh_token)
        .await?;
    if !rotated {
        tracing::warn!(user_id = %user.id, "Refresh token reuse detected");
        return Err(AppError::Auth(AuthError::RefreshTokenMismatch));
    }

    tracing::info!(user_id = %user.id, "Session refreshed");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie("accessToken", &access_token))
        .cookie(session_cookie("refreshToken", &refresh_token))
        .json(TokenPairResponse {
            success: true,
            access_token,
            refresh_token,
        }))
}

/// POST /users/change-password (protected)
///
/// The stored refresh token is intentionally left untouched; the
/// integration suite pins that behavior.
pub async fn change_password(
    current: web::ReqData<CurrentUser>,
    form: web::Json<ChangePasswordRequest>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let user = store
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Store(StoreError::NotFound("account".to_string())))?;

    if !verify_password(&form.old_password, &user.password_hash)? {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let password_hash = hash_password(&form.new_password)?;
    store.set_password_hash(current.id, &password_hash).await?;

    tracing::info!(user_id = %current.id, "Password changed");

    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: "Password changed".to_string(),
    }))
}

/// GET /users/me (protected)
pub async fn current_user(current: web::ReqData<CurrentUser>) -> HttpResponse {
    HttpResponse::Ok().json(ProfileResponse {
        success: true,
        user: current.profile.clone(),
    })
}

/// PATCH /users/me (protected)
///
/// Partial update of fullname and/or email. Email uniqueness is enforced
/// at the store, so a collision surfaces as 409.
pub async fn update_profile(
    current: web::ReqData<CurrentUser>,
    form: web::Json<UpdateProfileRequest>,
    store: web::Data<dyn CredentialStore>,
) -> Result<HttpResponse, AppError> {
    let mut update = ProfileUpdate::default();
    if let Some(fullname) = &form.fullname {
        update.fullname = Some(is_valid_fullname(fullname)?);
    }
    if let Some(email) = &form.email {
        update.email = Some(is_valid_email(email)?);
    }
    if update.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "update".to_string(),
        )));
    }

    let user = store
        .update_fields(current.id, &update)
        .await?
        .ok_or_else(|| AppError::Store(StoreError::NotFound("account".to_string())))?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        success: true,
        user: UserProfile::from(user),
    }))
}

/// PATCH /users/me/avatar (protected, multipart with an `avatar` file part)
pub async fn update_avatar(
    current: web::ReqData<CurrentUser>,
    payload: Multipart,
    store: web::Data<dyn CredentialStore>,
    media_store: web::Data<dyn MediaStore>,
    media_settings: web::Data<MediaSettings>,
) -> Result<HttpResponse, AppError> {
    replace_image(
        current,
        payload,
        store,
        media_store,
        media_settings,
        "avatar",
    )
    .await
}

/// PATCH /users/me/cover (protected, multipart with a `coverImage` file part)
pub async fn update_cover(
    current: web::ReqData<CurrentUser>,
    payload: Multipart,
    store: web::Data<dyn CredentialStore>,
    media_store: web::Data<dyn MediaStore>,
    media_settings: web::Data<MediaSettings>,
) -> Result<HttpResponse, AppError> {
    replace_image(
        current,
        payload,
        store,
        media_store,
        media_settings,
        "coverImage",
    )
    .await
}

async fn replace_image(
    current: web::ReqData<CurrentUser>,
    mut payload: Multipart,
    store: web::Data<dyn CredentialStore>,
    media_store: web::Data<dyn MediaStore>,
    media_settings: web::Data<MediaSettings>,
    field_name: &str,
) -> Result<HttpResponse, AppError> {
    let path = spool_named_file(&mut payload, Path::new(&media_settings.temp_dir), field_name)
        .await?
        .ok_or_else(|| {
            AppError::Validation(ValidationError::MissingUpload(field_name.to_string()))
        })?;

    let url = media::upload_and_discard(media_store.get_ref(), &path).await?;

    let update = match field_name {
        "avatar" => ProfileUpdate {
            avatar: Some(url),
            ..Default::default()
        },
        _ => ProfileUpdate {
            cover_image: Some(url),
            ..Default::default()
        },
    };

    let user = store
        .update_fields(current.id, &update)
        .await?
        .ok_or_else(|| AppError::Store(StoreError::NotFound("account".to_string())))?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        success: true,
        user: UserProfile::from(user),
    }))
}

// --- multipart plumbing ---

struct RegisterForm {
    fullname: String,
    username: String,
    email: String,
    password: String,
    avatar_path: Option<PathBuf>,
    cover_path: Option<PathBuf>,
}

impl RegisterForm {
    /// Parse the multipart body, spooling file parts under `temp_dir`.
    /// On parse failure, files spooled so far are removed before the
    /// error is returned.
    async fn parse(payload: &mut Multipart, temp_dir: &Path) -> Result<Self, AppError> {
        let mut form = RegisterForm {
            fullname: String::new(),
            username: String::new(),
            email: String::new(),
            password: String::new(),
            avatar_path: None,
            cover_path: None,
        };

        let result = Self::fill(&mut form, payload, temp_dir).await;
        if let Err(e) = result {
            for path in form.spooled_paths() {
                media::discard(&path).await;
            }
            return Err(e);
        }
        Ok(form)
    }

    async fn fill(
        form: &mut RegisterForm,
        payload: &mut Multipart,
        temp_dir: &Path,
    ) -> Result<(), AppError> {
        while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
            match field.name() {
                "fullname" => form.fullname = read_text_field(&mut field).await?,
                "username" => form.username = read_text_field(&mut field).await?,
                "email" => form.email = read_text_field(&mut field).await?,
                "password" => form.password = read_text_field(&mut field).await?,
                "avatar" => form.avatar_path = Some(spool_file(&mut field, temp_dir).await?),
                "coverImage" => form.cover_path = Some(spool_file(&mut field, temp_dir).await?),
                _ => drain_field(&mut field).await?,
            }
        }
        Ok(())
    }

    fn spooled_paths(&self) -> Vec<PathBuf> {
        self.avatar_path
            .iter()
            .chain(self.cover_path.iter())
            .cloned()
            .collect()
    }
}

fn multipart_error(e: actix_multipart::MultipartError) -> AppError {
    tracing::warn!("Malformed multipart body: {}", e);
    AppError::Validation(ValidationError::InvalidFormat("request body".to_string()))
}

async fn read_text_field(field: &mut Field) -> Result<String, AppError> {
    let name = field.name().to_string();
    let mut bytes = web::BytesMut::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::Validation(ValidationError::TooLong(
                name,
                MAX_TEXT_FIELD_BYTES,
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|_| AppError::Validation(ValidationError::InvalidFormat(name)))
}

/// Stream a file part to a uniquely-named file under `temp_dir`.
async fn spool_file(field: &mut Field, temp_dir: &Path) -> Result<PathBuf, AppError> {
    let original = field
        .content_disposition()
        .get_filename()
        .unwrap_or("upload");
    let safe_name: String = original
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let path = temp_dir.join(format!("{}-{}", Uuid::new_v4(), safe_name));
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::Media(crate::error::MediaError::LocalFile(e.to_string())))?;

    let result = async {
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            file.write_all(&chunk).await.map_err(|e| {
                AppError::Media(crate::error::MediaError::LocalFile(e.to_string()))
            })?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::Media(crate::error::MediaError::LocalFile(e.to_string())))
    }
    .await;

    match result {
        Ok(()) => Ok(path),
        Err(e) => {
            media::discard(&path).await;
            Err(e)
        }
    }
}

/// Find the named file part in a multipart body and spool it; other
/// fields are drained and ignored.
async fn spool_named_file(
    payload: &mut Multipart,
    temp_dir: &Path,
    field_name: &str,
) -> Result<Option<PathBuf>, AppError> {
    let mut spooled = None;
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        if field.name() == field_name && spooled.is_none() {
            spooled = Some(spool_file(&mut field, temp_dir).await?);
        } else {
            drain_field(&mut field).await?;
        }
    }
    Ok(spooled)
}

async fn drain_field(field: &mut Field) -> Result<(), AppError> {
    while field
        .try_next()
        .await
        .map_err(multipart_error)?
        .is_some()
    {}
    Ok(())
}

fn session_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .http_only(true)
        .secure(true)
        .path("/")
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "")
        .http_only(true)
        .secure(true)
        .path("/")
        .finish();
    cookie.make_removal();
    cookie
}
