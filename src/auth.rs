use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::{db, errors::AppError, AppState};

/// Token lifetime matches the 7-day sessions clients were built around.
const TOKEN_TTL_DAYS: i64 = 7;

/// Issues a fresh opaque bearer token for `user_id` and persists it with
/// its expiry.
pub async fn issue_token(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + Duration::days(TOKEN_TTL_DAYS);
    db::insert_token(state, &token, user_id, expires_at).await?;
    Ok(token)
}

/// Resolves a bearer token to the user id it was issued for.
pub async fn authenticate(state: &AppState, token: &str) -> Result<i64, AppError> {
    let row = db::find_token(state, token)
        .await?
        .ok_or(AppError::InvalidToken)?;
    if row.expires_at <= Utc::now() {
        return Err(AppError::TokenExpired);
    }
    Ok(row.user_id)
}

/// The authenticated principal, extracted from the `Authorization: Bearer`
/// header. Handlers take this as an argument and pass the id on explicitly;
/// caller identity is never pulled out of ambient state further down.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: i64,
}

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<AuthedUser, AppError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Box::pin(async move {
            let state = state.ok_or(AppError::Internal)?;
            let token = header
                .as_deref()
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or(AppError::MissingToken)?;
            let id = authenticate(&state, token).await?;
            Ok(AuthedUser { id })
        })
    }
}
