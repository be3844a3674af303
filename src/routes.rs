use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{self, AuthedUser},
    db,
    errors::AppError,
    models::NewDonation,
    utils, workflow, AppState,
};

#[derive(Deserialize)]
pub struct SignupForm {
    name: String,
    email: String,
    password: String,
}

#[post("/signup")]
pub async fn signup_handler(
    web::Json(form): web::Json<SignupForm>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    if form.name.is_empty() || form.email.is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".into()));
    }
    if !form.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }

    let email = form.email.to_lowercase();
    let pwd_hash = utils::hash_password(&form.password)?;
    db::create_user(&state, &form.name, &email, &pwd_hash).await?;

    Ok(HttpResponse::Created().json(json!({ "message": "Signup successful" })))
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

#[post("/login")]
pub async fn login_handler(
    web::Json(form): web::Json<LoginForm>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let email = form.email.to_lowercase();
    let user = db::get_user_by_email(&state, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    if !utils::verify_password(&form.password, &user.pwd_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = auth::issue_token(&state, user.id).await?;
    log::info!("User {} logged in", user.id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "token": token,
        "id": user.id,
        "name": user.name,
        "email": user.email,
    })))
}

/// Create a donation listing. The donor is the authenticated principal,
/// never a body field.
#[post("/donate")]
pub async fn donate_handler(
    caller: AuthedUser,
    web::Json(fields): web::Json<NewDonation>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let donation = workflow::create(&state, caller.id, &fields).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Donation successful",
        "donation": donation,
    })))
}

#[post("/request/{resource_id}")]
pub async fn request_handler(
    caller: AuthedUser,
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let donation = workflow::request(&state, path.into_inner(), caller.id).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Request registered",
        "donation": donation,
    })))
}

#[post("/donation/{resource_id}/accept/{requester_id}")]
pub async fn accept_handler(
    caller: AuthedUser,
    path: web::Path<(i64, i64)>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (donation_id, requester_id) = path.into_inner();
    let donation = workflow::accept(&state, donation_id, requester_id, caller.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Accepted request and rejected others",
        "donation": donation,
    })))
}

#[post("/donation/{id}/complete")]
pub async fn complete_handler(
    caller: AuthedUser,
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    workflow::complete(&state, path.into_inner(), caller.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Donation marked as donated" })))
}

#[get("/donatedResources")]
pub async fn donated_resources_handler(
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let donations = workflow::list_donated(&state).await?;
    Ok(HttpResponse::Ok().json(donations))
}

#[get("/profile/{user_id}")]
pub async fn profile_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let profile = workflow::get_profile(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn default_handler() -> impl Responder {
    HttpResponse::NotFound().json(json!({ "message": "Not found" }))
}

/// Registers the full route surface; shared by `main` and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(signup_handler)
        .service(login_handler)
        .service(donate_handler)
        .service(request_handler)
        .service(accept_handler)
        .service(complete_handler)
        .service(donated_resources_handler)
        .service(profile_handler)
        .default_service(web::to(default_handler));
}
