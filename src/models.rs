use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The identity shape exposed over the API: never the password hash.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Per-request outcome, tracked on each requester entry of a donation.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Overall lifecycle stage of a donation, distinct from any individual
/// request's status.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum FinalStatus {
    Available,
    InProcess,
    Donated,
}

impl FinalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalStatus::Available => "available",
            FinalStatus::InProcess => "in_process",
            FinalStatus::Donated => "donated",
        }
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow operations that touch a donation's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Request,
    Accept,
    Complete,
}

impl FinalStatus {
    /// Transition table for the donation lifecycle. Returns the state the
    /// donation ends up in, or `None` when the operation is illegal from
    /// the current state. New requests are only taken while the donation
    /// is still available, and a donation can only be marked donated after
    /// a request was accepted.
    pub fn apply(self, transition: Transition) -> Option<FinalStatus> {
        match (self, transition) {
            (FinalStatus::Available, Transition::Request) => Some(FinalStatus::Available),
            (FinalStatus::Available, Transition::Accept) => Some(FinalStatus::InProcess),
            (FinalStatus::InProcess, Transition::Complete) => Some(FinalStatus::Donated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DonationRow {
    pub id: i64,
    pub resource_name: String,
    pub quantity: i64,
    pub category: String,
    pub custom_category: Option<String>,
    pub description: String,
    pub location: String,
    pub images: Json<Vec<String>>,
    pub user_id: i64,
    pub final_status: FinalStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RequestRow {
    pub donation_id: i64,
    pub user_id: i64,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

/// Fields a donor submits when listing a resource. Image references are
/// plain strings; upload handling lives outside this service.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewDonation {
    pub resource_name: String,
    pub quantity: i64,
    pub category: String,
    #[serde(default)]
    pub custom_category: Option<String>,
    pub description: String,
    pub location: String,
    pub image: Vec<String>,
}

/// A requester entry as rendered to clients, identity resolved.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub user: PublicUser,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

/// A donation as rendered to clients: donor and requester identities
/// resolved to name/email.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DonationView {
    pub id: i64,
    pub resource_name: String,
    pub quantity: i64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<String>,
    pub description: String,
    pub location: String,
    pub image: Vec<String>,
    pub donor: PublicUser,
    pub requested_by: Vec<RequestView>,
    pub final_status: FinalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub name: String,
    pub donated_resources: Vec<DonationView>,
    pub requested_resources: Vec<DonationView>,
}
