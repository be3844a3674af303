#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;

use givebridge::{db, models::NewDonation, utils, AppState, MIGRATOR};

/// Fresh in-memory store. A single pooled connection keeps every query in
/// the test on the same in-memory database.
pub async fn test_state() -> AppState {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    MIGRATOR.run(&db_pool).await.expect("migrations");
    AppState { db_pool }
}

pub const TEST_PASSWORD: &str = "a-perfectly-fine-password";

pub async fn seed_user(state: &AppState, name: &str, email: &str) -> i64 {
    let pwd_hash = utils::hash_password(TEST_PASSWORD).expect("hash");
    db::create_user(state, name, email, &pwd_hash)
        .await
        .expect("seed user")
        .id
}

pub fn sample_donation() -> NewDonation {
    NewDonation {
        resource_name: "Rice".to_owned(),
        quantity: 3,
        category: "food".to_owned(),
        custom_category: None,
        description: "Three bags of rice".to_owned(),
        location: "Springfield".to_owned(),
        image: vec!["/uploads/rice-1.jpg".to_owned(), "/uploads/rice-2.jpg".to_owned()],
    }
}
