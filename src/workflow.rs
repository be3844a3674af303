//! The donation workflow: request, accept-with-auto-reject, complete, and
//! the read-side listing and profile queries. Every operation takes the
//! acting user id as an explicit parameter; authorization is decided here,
//! not in the HTTP layer.

use crate::{
    db,
    errors::AppError,
    models::{DonationRow, DonationView, NewDonation, ProfileView, RequestView, Transition},
    AppState,
};

const MAX_IMAGES: usize = 5;

/// Resolves donor and requester identities for a donation row.
async fn enrich(state: &AppState, row: DonationRow) -> Result<DonationView, AppError> {
    let requests = db::requests_for(state, row.id).await?;

    let mut ids: Vec<i64> = requests.iter().map(|r| r.user_id).collect();
    ids.push(row.user_id);
    ids.sort_unstable();
    ids.dedup();
    let users = db::get_public_users(state, &ids).await?;

    let donor = users.get(&row.user_id).cloned().ok_or(AppError::Internal)?;
    let requested_by = requests
        .into_iter()
        .map(|r| {
            let user = users.get(&r.user_id).cloned().ok_or(AppError::Internal)?;
            Ok(RequestView {
                user,
                status: r.status,
                requested_at: r.requested_at,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(DonationView {
        id: row.id,
        resource_name: row.resource_name,
        quantity: row.quantity,
        category: row.category,
        custom_category: row.custom_category,
        description: row.description,
        location: row.location,
        image: row.images.0,
        donor,
        requested_by,
        final_status: row.final_status,
        created_at: row.created_at,
    })
}

async fn enrich_all(
    state: &AppState,
    rows: Vec<DonationRow>,
) -> Result<Vec<DonationView>, AppError> {
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(enrich(state, row).await?);
    }
    Ok(views)
}

async fn fetch_donation(state: &AppState, donation_id: i64) -> Result<DonationRow, AppError> {
    db::get_donation(state, donation_id)
        .await?
        .ok_or(AppError::DonationNotFound)
}

/// Lists a new donation owned by `donor_id`, starting out available.
pub async fn create(
    state: &AppState,
    donor_id: i64,
    fields: &NewDonation,
) -> Result<DonationView, AppError> {
    if fields.image.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".into()));
    }
    if fields.image.len() > MAX_IMAGES {
        return Err(AppError::BadRequest(format!(
            "At most {} images are allowed",
            MAX_IMAGES
        )));
    }
    if fields.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    let row = db::create_donation(state, donor_id, fields).await?;
    enrich(state, row).await
}

/// Registers `requester_id`'s claim on a donation. Donors cannot request
/// their own listing, and a user appears at most once per donation.
pub async fn request(
    state: &AppState,
    donation_id: i64,
    requester_id: i64,
) -> Result<DonationView, AppError> {
    let donation = fetch_donation(state, donation_id).await?;
    if donation.user_id == requester_id {
        return Err(AppError::OwnDonation);
    }
    let requests = db::requests_for(state, donation_id).await?;
    if requests.iter().any(|r| r.user_id == requester_id) {
        return Err(AppError::AlreadyRequested);
    }
    donation
        .final_status
        .apply(Transition::Request)
        .ok_or(AppError::InvalidState(donation.final_status))?;

    db::add_request(state, donation_id, requester_id, donation.version).await?;
    log::info!(
        "User {} requested donation {}",
        requester_id,
        donation_id
    );

    let row = fetch_donation(state, donation_id).await?;
    enrich(state, row).await
}

/// Accepts one requester and auto-rejects all others, moving the donation
/// to in_process. Only the owning donor may accept.
pub async fn accept(
    state: &AppState,
    donation_id: i64,
    requester_id: i64,
    donor_id: i64,
) -> Result<DonationView, AppError> {
    let donation = fetch_donation(state, donation_id).await?;
    if donation.user_id != donor_id {
        return Err(AppError::Forbidden);
    }
    let requests = db::requests_for(state, donation_id).await?;
    if !requests.iter().any(|r| r.user_id == requester_id) {
        return Err(AppError::RequesterNotFound);
    }
    donation
        .final_status
        .apply(Transition::Accept)
        .ok_or(AppError::InvalidState(donation.final_status))?;

    db::accept_request(state, donation_id, requester_id, donation.version).await?;
    log::info!(
        "Donation {}: accepted requester {}, others rejected",
        donation_id,
        requester_id
    );

    let row = fetch_donation(state, donation_id).await?;
    enrich(state, row).await
}

/// Marks an in_process donation as donated. Only the owning donor may
/// complete.
pub async fn complete(
    state: &AppState,
    donation_id: i64,
    donor_id: i64,
) -> Result<(), AppError> {
    let donation = fetch_donation(state, donation_id).await?;
    if donation.user_id != donor_id {
        return Err(AppError::Forbidden);
    }
    donation
        .final_status
        .apply(Transition::Complete)
        .ok_or(AppError::InvalidState(donation.final_status))?;

    db::complete_donation(state, donation_id, donation.version).await?;
    log::info!("Donation {} marked as donated", donation_id);
    Ok(())
}

/// Every donation on record, donor identity resolved. No pagination;
/// category filtering happens client-side.
pub async fn list_donated(state: &AppState) -> Result<Vec<DonationView>, AppError> {
    let rows = db::list_donations(state).await?;
    enrich_all(state, rows).await
}

/// A user's profile: their display name, the donations they own and the
/// donations they have requested. Two independent queries over the same
/// store.
pub async fn get_profile(state: &AppState, user_id: i64) -> Result<ProfileView, AppError> {
    let user = db::get_user_by_id(state, user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let donated = db::donations_by_owner(state, user_id).await?;
    let requested = db::donations_requested_by(state, user_id).await?;

    Ok(ProfileView {
        name: user.name,
        donated_resources: enrich_all(state, donated).await?,
        requested_resources: enrich_all(state, requested).await?,
    })
}
