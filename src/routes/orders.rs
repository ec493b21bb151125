//! # Order Routes

use axum::{extract::State, response::Json};

use crate::database::models::InsertAck;
use crate::database::store::{Collection, Document};
use crate::error::AppError;
use crate::server::AppState;

/// `POST /order`: stores the order exactly as sent
pub async fn place_order(
    State(state): State<AppState>,
    Json(order): Json<Document>,
) -> Result<Json<InsertAck>, AppError> {
    let outcome = state.store.insert_one(Collection::Orders, order).await?;
    tracing::info!("🧾 Order placed: {}", outcome.inserted_id);
    Ok(Json(outcome.into()))
}
