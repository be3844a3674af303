use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::{
    errors::AppError,
    models::{
        DonationRow, FinalStatus, NewDonation, PublicUser, RequestRow, RequestStatus, TokenRow,
        User,
    },
    AppState,
};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub async fn create_user(
    state: &AppState,
    name: &str,
    email: &str,
    pwd_hash: &str,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, pwd_hash, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(name)
    .bind(email)
    .bind(pwd_hash)
    .bind(Utc::now())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::EmailTaken
        } else {
            AppError::Database(e)
        }
    })?;
    log::info!("User created: {} <{}>", user.id, user.email);
    Ok(user)
}

pub async fn get_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&state.db_pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_id(state: &AppState, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?;
    Ok(user)
}

/// Resolves a set of user ids to their public identities in one query.
pub async fn get_public_users(
    state: &AppState,
    ids: &[i64],
) -> Result<HashMap<i64, PublicUser>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders = (1..=ids.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT id, name, email FROM users WHERE id IN ({})", placeholders);
    let mut query = sqlx::query_as::<_, PublicUser>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let users = query.fetch_all(&state.db_pool).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn insert_token(
    state: &AppState,
    token: &str,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&state.db_pool)
        .await?;
    Ok(())
}

pub async fn find_token(state: &AppState, token: &str) -> Result<Option<TokenRow>, AppError> {
    let row = sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token = $1")
        .bind(token)
        .fetch_optional(&state.db_pool)
        .await?;
    Ok(row)
}

pub async fn create_donation(
    state: &AppState,
    donor_id: i64,
    fields: &NewDonation,
) -> Result<DonationRow, AppError> {
    let donation = sqlx::query_as::<_, DonationRow>(
        "INSERT INTO donations (resource_name, quantity, category, custom_category, description, \
         location, images, user_id, final_status, version, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10) RETURNING *",
    )
    .bind(&fields.resource_name)
    .bind(fields.quantity)
    .bind(&fields.category)
    .bind(fields.custom_category.as_deref())
    .bind(&fields.description)
    .bind(&fields.location)
    .bind(Json(&fields.image))
    .bind(donor_id)
    .bind(FinalStatus::Available)
    .bind(Utc::now())
    .fetch_one(&state.db_pool)
    .await?;
    log::info!("Donation created: {} by user {}", donation.id, donor_id);
    Ok(donation)
}

pub async fn get_donation(state: &AppState, id: i64) -> Result<Option<DonationRow>, AppError> {
    let donation = sqlx::query_as::<_, DonationRow>("SELECT * FROM donations WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?;
    Ok(donation)
}

pub async fn list_donations(state: &AppState) -> Result<Vec<DonationRow>, AppError> {
    let donations = sqlx::query_as::<_, DonationRow>("SELECT * FROM donations ORDER BY id")
        .fetch_all(&state.db_pool)
        .await?;
    Ok(donations)
}

pub async fn donations_by_owner(
    state: &AppState,
    user_id: i64,
) -> Result<Vec<DonationRow>, AppError> {
    let donations =
        sqlx::query_as::<_, DonationRow>("SELECT * FROM donations WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&state.db_pool)
            .await?;
    Ok(donations)
}

pub async fn donations_requested_by(
    state: &AppState,
    user_id: i64,
) -> Result<Vec<DonationRow>, AppError> {
    let donations = sqlx::query_as::<_, DonationRow>(
        "SELECT d.* FROM donations d \
         JOIN requests r ON r.donation_id = d.id \
         WHERE r.user_id = $1 ORDER BY d.id",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(donations)
}

pub async fn requests_for(
    state: &AppState,
    donation_id: i64,
) -> Result<Vec<RequestRow>, AppError> {
    let requests = sqlx::query_as::<_, RequestRow>(
        "SELECT donation_id, user_id, status, requested_at \
         FROM requests WHERE donation_id = $1 ORDER BY id",
    )
    .bind(donation_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(requests)
}

/// Appends a pending request. The donation row is bumped with a conditional
/// update first so a request racing an accept on the same donation loses
/// cleanly; the unique constraint on (donation_id, user_id) backs up the
/// caller's duplicate check.
pub async fn add_request(
    state: &AppState,
    donation_id: i64,
    requester_id: i64,
    expected_version: i64,
) -> Result<(), AppError> {
    let mut tx = state.db_pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE donations SET version = version + 1 \
         WHERE id = $1 AND version = $2 AND final_status = $3",
    )
    .bind(donation_id)
    .bind(expected_version)
    .bind(FinalStatus::Available)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::ConcurrentUpdate);
    }

    sqlx::query(
        "INSERT INTO requests (donation_id, user_id, status, requested_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(donation_id)
    .bind(requester_id)
    .bind(RequestStatus::Pending)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::AlreadyRequested
        } else {
            AppError::Database(e)
        }
    })?;

    tx.commit().await?;
    Ok(())
}

/// Accepts one requester and rejects every other one, moving the donation to
/// in_process, in a single transaction. The status-scoped conditional update
/// on the donation row means that of two concurrent accepts exactly one
/// commits; the loser sees zero rows updated.
pub async fn accept_request(
    state: &AppState,
    donation_id: i64,
    requester_id: i64,
    expected_version: i64,
) -> Result<(), AppError> {
    let mut tx = state.db_pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE donations SET final_status = $1, version = version + 1 \
         WHERE id = $2 AND version = $3 AND final_status = $4",
    )
    .bind(FinalStatus::InProcess)
    .bind(donation_id)
    .bind(expected_version)
    .bind(FinalStatus::Available)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::ConcurrentUpdate);
    }

    sqlx::query(
        "UPDATE requests SET status = CASE WHEN user_id = $1 THEN $2 ELSE $3 END \
         WHERE donation_id = $4",
    )
    .bind(requester_id)
    .bind(RequestStatus::Accepted)
    .bind(RequestStatus::Rejected)
    .bind(donation_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Moves an in_process donation to donated with the same conditional-update
/// guard as `accept_request`.
pub async fn complete_donation(
    state: &AppState,
    donation_id: i64,
    expected_version: i64,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE donations SET final_status = $1, version = version + 1 \
         WHERE id = $2 AND version = $3 AND final_status = $4",
    )
    .bind(FinalStatus::Donated)
    .bind(donation_id)
    .bind(expected_version)
    .bind(FinalStatus::InProcess)
    .execute(&state.db_pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::ConcurrentUpdate);
    }
    Ok(())
}
