//! # Food Routes
//!
//! Browsing, lookup and mutation of food items. Only `/myFood` sits behind
//! the auth gate; everything else is public.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::auth::models::AuthUser;
use crate::database::models::{
    from_documents, to_document, Food, FoodFields, FromDocument, InsertAck, NewFood, PurchaseCountUpdate, UpdateAck,
};
use crate::database::store::{Collection, Document, DocumentId, Filter, FindOptions, Sort};
use crate::error::AppError;
use crate::server::AppState;
use crate::services::food_query::FoodListingParams;

/// How many items the best-seller strip shows
pub const TOP_SELLING_LIMIT: u64 = 6;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct MyFoodQuery {
    pub email: Option<String>,
}

/// `GET /topSelling`: most purchased items first
pub async fn top_selling(State(state): State<AppState>) -> Result<Json<Vec<Food>>, AppError> {
    let options = FindOptions::default()
        .sorted(Sort::descending("purchaseCount"))
        .limit(TOP_SELLING_LIMIT);
    let docs = state.store.find(Collection::Foods, &Filter::All, &options).await?;
    Ok(Json(from_documents(docs)?))
}

/// `GET /foods`: optional search, pagination and price sort
pub async fn list_foods(
    State(state): State<AppState>,
    Query(params): Query<FoodListingParams>,
) -> Result<Json<Vec<Food>>, AppError> {
    let query = params.build();
    tracing::debug!("Listing foods with {:?}", query);
    let docs = state.store.find(Collection::Foods, &query.filter, &query.options).await?;
    Ok(Json(from_documents(docs)?))
}

/// `GET /totalFoods`
pub async fn total_foods(State(state): State<AppState>) -> Result<Json<CountResponse>, AppError> {
    let count = state.store.estimated_count(Collection::Foods).await?;
    Ok(Json(CountResponse { count }))
}

/// `GET /food/{id}`: the item, or `null` when nothing has that id
pub async fn food_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Food>>, AppError> {
    let id: DocumentId = id.parse()?;
    let food = state
        .store
        .find_one(Collection::Foods, &Filter::ById(id))
        .await?
        .map(Food::from_document)
        .transpose()?;
    Ok(Json(food))
}

/// `GET /myFood?email=`: items listed by the caller. The token's email has
/// to match the one asked for.
pub async fn my_foods(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MyFoodQuery>,
) -> Result<Json<Vec<Food>>, AppError> {
    let email = match query.email {
        Some(email) if user.owns_email(&email) => email,
        requested => {
            tracing::warn!("Forbidden /myFood: token email {:?}, requested {:?}", user.email, requested);
            return Err(AppError::Forbidden);
        }
    };

    let docs = state
        .store
        .find(Collection::Foods, &Filter::equals("addBy.email", email), &FindOptions::default())
        .await?;
    Ok(Json(from_documents(docs)?))
}

/// `POST /addFood`
pub async fn add_food(
    State(state): State<AppState>,
    Json(food): Json<NewFood>,
) -> Result<Json<InsertAck>, AppError> {
    let outcome = state.store.insert_one(Collection::Foods, to_document(&food)?).await?;
    info!("🍽️ Added food {:?} as {}", food.fields.name, outcome.inserted_id);
    Ok(Json(outcome.into()))
}

/// `PUT /updateFood/{id}`: replaces every editable field
pub async fn update_food(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<FoodFields>,
) -> Result<Json<UpdateAck>, AppError> {
    let id: DocumentId = id.parse()?;
    let outcome = state
        .store
        .update_one(Collection::Foods, &Filter::ById(id), to_document(&fields)?)
        .await?;
    info!("Updated food {}: matched={} modified={}", id, outcome.matched_count, outcome.modified_count);
    Ok(Json(outcome.into()))
}

/// `PUT /purchaseCount/{id}`: overwrites the counter with the given value
pub async fn update_purchase_count(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PurchaseCountUpdate>,
) -> Result<Json<UpdateAck>, AppError> {
    let id: DocumentId = id.parse()?;
    let mut set = Document::new();
    set.insert("purchaseCount".to_string(), json!(update.count));

    let outcome = state.store.update_one(Collection::Foods, &Filter::ById(id), set).await?;
    info!("Set purchase count of {} to {}", id, update.count);
    Ok(Json(outcome.into()))
}
