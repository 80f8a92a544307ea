//! Inbound authentication gate for protected routes.
//!
//! Extracts the access token from the `accessToken` cookie or the
//! `Authorization: Bearer` header, verifies it, loads the account (minus
//! secrets) and attaches it to the request extensions as `CurrentUser`
//! for downstream handlers. Absent or failing tokens are rejected with
//! 401 before the handler runs.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::verify_access_token;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::users::{CredentialStore, UserProfile};

/// The authenticated account attached to the request context.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub profile: UserProfile,
}

pub struct JwtGuard {
    jwt_config: JwtSettings,
    store: Arc<dyn CredentialStore>,
}

impl JwtGuard {
    pub fn new(jwt_config: JwtSettings, store: Arc<dyn CredentialStore>) -> Self {
        Self { jwt_config, store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtGuardService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct JwtGuardService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
    store: Arc<dyn CredentialStore>,
}

impl<S, B> Service<ServiceRequest> for JwtGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Cookie first, then bearer header
        let token = req
            .cookie("accessToken")
            .map(|c| c.value().to_string())
            .or_else(|| {
                req.headers()
                    .get("Authorization")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .map(|t| t.to_string())
            });

        let jwt_config = self.jwt_config.clone();
        let store = self.store.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let token = token.ok_or_else(|| {
                tracing::warn!("Request without access token");
                Error::from(AppError::Auth(AuthError::MissingToken))
            })?;

            let claims = verify_access_token(&token, &jwt_config).map_err(|e| {
                tracing::warn!("Access token rejected: {}", e);
                Error::from(AppError::from(e))
            })?;

            let user_id = claims.user_id().map_err(Error::from)?;
            let user = store
                .find_by_id(user_id)
                .await
                .map_err(Error::from)?
                .ok_or_else(|| {
                    tracing::warn!(user_id = %user_id, "Token subject no longer exists");
                    Error::from(AppError::Auth(AuthError::TokenInvalid))
                })?;

            req.extensions_mut().insert(CurrentUser {
                id: user.id,
                profile: UserProfile::from(&user),
            });

            tracing::debug!(user_id = %claims.sub, "Access token validated");

            service.call(req).await
        })
    }
}
