mod common;

use givebridge::{
    db,
    errors::AppError,
    models::{FinalStatus, RequestStatus},
    workflow,
};

use common::{sample_donation, seed_user, test_state};

#[tokio::test]
async fn owner_cannot_request_own_donation() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();

    let err = workflow::request(&state, donation.id, donor).await.unwrap_err();
    assert!(matches!(err, AppError::OwnDonation));

    // request list unchanged
    let requests = db::requests_for(&state, donation.id).await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn second_request_by_same_user_conflicts() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let requester = seed_user(&state, "Bob", "bob@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();

    workflow::request(&state, donation.id, requester).await.unwrap();
    let err = workflow::request(&state, donation.id, requester)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyRequested));

    let requests = db::requests_for(&state, donation.id).await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn request_on_unknown_donation_is_not_found() {
    let state = test_state().await;
    let requester = seed_user(&state, "Bob", "bob@example.com").await;

    let err = workflow::request(&state, 999, requester).await.unwrap_err();
    assert!(matches!(err, AppError::DonationNotFound));
}

#[tokio::test]
async fn full_lifecycle_accept_rejects_others_then_complete() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let carol = seed_user(&state, "Carol", "carol@example.com").await;

    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    assert_eq!(donation.final_status, FinalStatus::Available);

    let after_bob = workflow::request(&state, donation.id, bob).await.unwrap();
    assert_eq!(after_bob.requested_by.len(), 1);
    assert_eq!(after_bob.requested_by[0].user.id, bob);
    assert_eq!(after_bob.requested_by[0].status, RequestStatus::Pending);

    let after_carol = workflow::request(&state, donation.id, carol).await.unwrap();
    assert_eq!(after_carol.requested_by.len(), 2);
    assert!(after_carol
        .requested_by
        .iter()
        .all(|r| r.status == RequestStatus::Pending));

    let accepted = workflow::accept(&state, donation.id, bob, donor)
        .await
        .unwrap();
    assert_eq!(accepted.final_status, FinalStatus::InProcess);
    let winners: Vec<_> = accepted
        .requested_by
        .iter()
        .filter(|r| r.status == RequestStatus::Accepted)
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].user.id, bob);
    assert!(accepted
        .requested_by
        .iter()
        .filter(|r| r.user.id != bob)
        .all(|r| r.status == RequestStatus::Rejected));

    workflow::complete(&state, donation.id, donor).await.unwrap();
    let row = db::get_donation(&state, donation.id).await.unwrap().unwrap();
    assert_eq!(row.final_status, FinalStatus::Donated);
}

#[tokio::test]
async fn accept_by_non_owner_is_forbidden_and_leaves_donation_unmodified() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    workflow::request(&state, donation.id, bob).await.unwrap();

    let err = workflow::accept(&state, donation.id, bob, bob)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let row = db::get_donation(&state, donation.id).await.unwrap().unwrap();
    assert_eq!(row.final_status, FinalStatus::Available);
    let requests = db::requests_for(&state, donation.id).await.unwrap();
    assert!(requests.iter().all(|r| r.status == RequestStatus::Pending));
}

#[tokio::test]
async fn accept_of_absent_requester_is_not_found() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();

    let err = workflow::accept(&state, donation.id, bob, donor)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RequesterNotFound));
}

#[tokio::test]
async fn complete_without_prior_accept_is_rejected() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();

    let err = workflow::complete(&state, donation.id, donor)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(FinalStatus::Available)));

    let row = db::get_donation(&state, donation.id).await.unwrap().unwrap();
    assert_eq!(row.final_status, FinalStatus::Available);
}

#[tokio::test]
async fn complete_by_non_owner_is_forbidden() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    workflow::request(&state, donation.id, bob).await.unwrap();
    workflow::accept(&state, donation.id, bob, donor).await.unwrap();

    let err = workflow::complete(&state, donation.id, bob)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn request_after_accept_is_rejected() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let carol = seed_user(&state, "Carol", "carol@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    workflow::request(&state, donation.id, bob).await.unwrap();
    workflow::accept(&state, donation.id, bob, donor).await.unwrap();

    let err = workflow::request(&state, donation.id, carol)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(FinalStatus::InProcess)));
}

#[tokio::test]
async fn second_accept_is_rejected() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let carol = seed_user(&state, "Carol", "carol@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    workflow::request(&state, donation.id, bob).await.unwrap();
    workflow::request(&state, donation.id, carol).await.unwrap();
    workflow::accept(&state, donation.id, bob, donor).await.unwrap();

    let err = workflow::accept(&state, donation.id, carol, donor)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(FinalStatus::InProcess)));

    // the first winner stands
    let requests = db::requests_for(&state, donation.id).await.unwrap();
    let accepted: Vec<_> = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Accepted)
        .collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].user_id, bob);
}

#[tokio::test]
async fn stale_version_loses_the_conditional_update() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;
    let donation = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    workflow::request(&state, donation.id, bob).await.unwrap();

    // a writer holding the pre-request version is one step behind
    let err = db::accept_request(&state, donation.id, bob, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrentUpdate));

    let row = db::get_donation(&state, donation.id).await.unwrap().unwrap();
    assert_eq!(row.final_status, FinalStatus::Available);
}

#[tokio::test]
async fn profile_aggregates_owned_and_requested_donations() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    let bob = seed_user(&state, "Bob", "bob@example.com").await;

    let own = workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();
    let bobs = workflow::create(&state, bob, &sample_donation())
        .await
        .unwrap();
    workflow::request(&state, bobs.id, donor).await.unwrap();

    let profile = workflow::get_profile(&state, donor).await.unwrap();
    assert_eq!(profile.name, "Alice");
    assert_eq!(profile.donated_resources.len(), 1);
    assert_eq!(profile.donated_resources[0].id, own.id);
    assert_eq!(profile.requested_resources.len(), 1);
    assert_eq!(profile.requested_resources[0].id, bobs.id);
    assert_eq!(
        profile.requested_resources[0].requested_by[0].user.email,
        "alice@example.com"
    );
}

#[tokio::test]
async fn profile_of_unknown_user_is_not_found() {
    let state = test_state().await;
    let err = workflow::get_profile(&state, 42).await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound));
}

#[tokio::test]
async fn listing_requires_one_to_five_images() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;

    let mut none = sample_donation();
    none.image.clear();
    let err = workflow::create(&state, donor, &none).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mut too_many = sample_donation();
    too_many.image = (0..6).map(|i| format!("/uploads/{}.jpg", i)).collect();
    let err = workflow::create(&state, donor, &too_many).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn list_donated_resolves_donor_identity() {
    let state = test_state().await;
    let donor = seed_user(&state, "Alice", "alice@example.com").await;
    workflow::create(&state, donor, &sample_donation())
        .await
        .unwrap();

    let listed = workflow::list_donated(&state).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].donor.name, "Alice");
    assert_eq!(listed[0].donor.email, "alice@example.com");
    assert_eq!(listed[0].image.len(), 2);
}
