//! # User Routes
//!
//! Listing requires a session; registration does not.

use axum::{extract::State, response::Json};

use crate::database::models::{from_documents, to_document, NewUser, SuccessResponse, User};
use crate::database::store::{Collection, Filter, FindOptions};
use crate::error::AppError;
use crate::server::AppState;

/// `GET /users`
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let docs = state.store.find(Collection::Users, &Filter::All, &FindOptions::default()).await?;
    Ok(Json(from_documents(docs)?))
}

/// `POST /users`
pub async fn add_user(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> Result<Json<SuccessResponse>, AppError> {
    let outcome = state.store.insert_one(Collection::Users, to_document(&user)?).await?;
    tracing::info!("👤 Registered user {} as {}", user.email, outcome.inserted_id);
    Ok(Json(SuccessResponse {
        success: true,
        inserted_id: Some(outcome.inserted_id),
    }))
}
