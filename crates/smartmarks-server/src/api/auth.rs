use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use smartmarks_core::{AuthBoundary, User};

use crate::auth::RequestAuth;
use crate::error::AppError;
use crate::AppState;

/// Identity already verified by the provider exchange
#[derive(Debug, Deserialize)]
pub struct CallbackIdentity {
    pub subject: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: User,
}

/// The signed-in user, or null
async fn current_user(auth: RequestAuth) -> Json<Option<User>> {
    Json(auth.current_user().await)
}

/// Start a provider sign-in
async fn sign_in(auth: RequestAuth, Path(provider): Path<String>) -> Result<Redirect, AppError> {
    let redirect = auth.sign_in(&provider).await?;
    Ok(Redirect::to(&redirect.location))
}

async fn sign_out(auth: RequestAuth) -> Result<StatusCode, AppError> {
    auth.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mint a session for an identity the provider has already verified
async fn provider_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    identity: Result<Json<CallbackIdentity>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    if !state.trusted_callback {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    let Json(identity) = identity?;
    if identity.subject.trim().is_empty() {
        return Err(AppError::BadRequest("subject is required".to_string()));
    }

    let mut user = User::new(identity.subject, provider);
    user.email = identity.email;
    let access_token = state.auth.issue_token(&user)?;
    tracing::info!("Signed in {} via {}", user.id, user.provider);

    Ok(Json(SessionResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth.expires_in().as_secs(),
        user,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/user", get(current_user))
        .route("/auth/sign-in/{provider}", get(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/callback/{provider}", post(provider_callback))
}
