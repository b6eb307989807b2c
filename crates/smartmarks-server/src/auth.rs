use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use smartmarks_core::{AuthBoundary, BookmarkError, SignInRedirect, User, UserId};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::error_response;
use crate::AppState;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Sign-in provider '{0}' is not supported")]
    UnsupportedProvider(String),

    #[error("Sign-in with '{0}' is not configured for this server")]
    NotConfigured(String),

    #[error("Auth error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_response(&self) -> Response {
        let status = match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::UnsupportedProvider(_) | AuthError::NotConfigured(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Internal(msg) => {
                tracing::error!("Auth error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, &self.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.status_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    provider: String,
    jti: String,
    iat: usize,
    exp: usize,
}

/// A validated session token
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token_id: String,
    pub expires_at: usize,
}

/// Issues and validates session tokens and builds provider sign-in URLs.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    google_client_id: Option<String>,
    redirect_url: String,
    /// Signed-out token ids and their expiry
    revoked: RwLock<HashMap<String, usize>>,
}

fn now_secs() -> Result<Duration, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AuthError::Internal("System clock is before UNIX_EPOCH".into()))
}

impl AuthManager {
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            encoding_key: EncodingKey::from_secret(&config.jwt_secret),
            decoding_key: DecodingKey::from_secret(&config.jwt_secret),
            validation,
            token_ttl: config.session_ttl,
            google_client_id: config.google_client_id.clone(),
            redirect_url: config.redirect_url.clone(),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = now_secs()?;
        let exp = now + self.token_ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            provider: user.provider.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.as_secs() as usize,
            exp: exp.as_secs() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
                | jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_) => {
                    AuthError::Unauthorized
                }
                other => AuthError::Internal(format!("Failed to validate token: {other:?}")),
            })?;

        let revoked = self.revoked.read().unwrap_or_else(PoisonError::into_inner);
        if revoked.contains_key(&claims.jti) {
            return Err(AuthError::Unauthorized);
        }

        Ok(Session {
            user: User {
                id: UserId::new(claims.sub),
                email: claims.email,
                provider: claims.provider,
            },
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Invalidate a session before its expiry
    pub fn revoke(&self, session: &Session) {
        let now = now_secs().map(|d| d.as_secs() as usize).unwrap_or(0);
        let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);
        revoked.retain(|_, exp| *exp >= now);
        revoked.insert(session.token_id.clone(), session.expires_at);
    }

    pub fn authorize_url(&self, provider: &str) -> Result<SignInRedirect, AuthError> {
        match provider {
            "google" => {
                let client_id = self
                    .google_client_id
                    .as_deref()
                    .ok_or_else(|| AuthError::NotConfigured(provider.to_string()))?;
                let state = Uuid::new_v4().to_string();
                let location = Url::parse_with_params(
                    GOOGLE_AUTHORIZE_URL,
                    &[
                        ("client_id", client_id),
                        ("redirect_uri", self.redirect_url.as_str()),
                        ("response_type", "code"),
                        ("scope", "openid email profile"),
                        ("state", state.as_str()),
                    ],
                )
                .map_err(|e| AuthError::Internal(format!("Failed to build sign-in URL: {e}")))?;

                Ok(SignInRedirect {
                    provider: provider.to_string(),
                    location: location.into(),
                })
            }
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }

    pub fn expires_in(&self) -> Duration {
        self.token_ttl
    }
}

/// Per-request auth context: the manager plus whatever session the request
/// carried. Invalid or revoked tokens resolve to "no user".
#[derive(Clone)]
pub struct RequestAuth {
    manager: Arc<AuthManager>,
    session: Option<Session>,
}

impl RequestAuth {
    pub fn from_token(manager: Arc<AuthManager>, token: Option<&str>) -> Self {
        let session = token.and_then(|token| match manager.resolve(token) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                None
            }
        });
        Self { manager, session }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn require_user(&self, action: &str) -> Result<&User, BookmarkError> {
        self.user().ok_or_else(|| BookmarkError::unauthenticated(action))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut split = header.splitn(2, ' ');
    let (Some(scheme), Some(token)) = (split.next(), split.next()) else {
        return None;
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequestAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequestAuth::from_token(
            Arc::clone(&state.auth),
            bearer_token(parts),
        ))
    }
}

fn to_bookmark_error(err: AuthError) -> BookmarkError {
    match err {
        AuthError::Unauthorized => BookmarkError::unauthenticated("sign in"),
        AuthError::UnsupportedProvider(_) | AuthError::NotConfigured(_) => {
            BookmarkError::InvalidInput(err.to_string())
        }
        AuthError::Internal(msg) => BookmarkError::Persistence(msg),
    }
}

#[async_trait]
impl AuthBoundary for RequestAuth {
    async fn current_user(&self) -> Option<User> {
        self.user().cloned()
    }

    async fn sign_in(&self, provider: &str) -> smartmarks_core::error::Result<SignInRedirect> {
        self.manager.authorize_url(provider).map_err(to_bookmark_error)
    }

    async fn sign_out(&self) -> smartmarks_core::error::Result<()> {
        if let Some(session) = &self.session {
            self.manager.revoke(session);
            tracing::info!("Signed out {}", session.user.id);
        }
        Ok(())
    }
}
