// Database Models
//
// Typed views over the JSON documents kept in the `foods`, `users` and
// `orders` collections, plus the acknowledgement shapes returned by writes.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::database::store::{Document, DocumentId, InsertOutcome, StoreError, UpdateOutcome};

/// Trait for converting from a stored document
pub trait FromDocument: Sized {
    fn from_document(doc: Document) -> Result<Self, StoreError>;
}

impl<T: DeserializeOwned> FromDocument for T {
    fn from_document(doc: Document) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}

/// Decode a batch of stored documents
pub fn from_documents<T: FromDocument>(docs: Vec<Document>) -> Result<Vec<T>, StoreError> {
    docs.into_iter().map(T::from_document).collect()
}

/// Serialize a value that must come out as a JSON object
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(doc) => Ok(doc),
        _ => Err(StoreError::NotAnObject),
    }
}

// ============================================================================
// FOOD MODELS
// ============================================================================

/// Who listed a food item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub name: String,
    pub email: String,
}

/// Editable food fields; an update replaces all of them at once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FoodFields {
    pub name: String,
    pub image: String,
    pub category: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub quantity: i64,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    pub origin: String,
    pub description: String,
    pub add_by: Owner,
}

// Form posts send numbers as text; blank or null reads as zero.

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().ok_or_else(|| de::Error::custom("number out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(de::Error::custom(format!("expected a number, found {s:?}"))),
        },
        other => Err(de::Error::custom(format!("expected a number, found {other}"))),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let whole = |f: f64| (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64);
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole))
            .ok_or_else(|| de::Error::custom(format!("expected a whole number, found {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
                .ok_or_else(|| de::Error::custom(format!("expected a whole number, found {s:?}")))
        }
        other => Err(de::Error::custom(format!("expected a whole number, found {other}"))),
    }
}

/// Body of `POST /addFood`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFood {
    #[serde(flatten)]
    pub fields: FoodFields,
    #[serde(default)]
    pub purchase_count: i64,
}

/// A stored food item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(flatten)]
    pub fields: FoodFields,
    #[serde(default)]
    pub purchase_count: i64,
}

/// Body of `PUT /purchaseCount/{id}`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PurchaseCountUpdate {
    pub count: i64,
}

// ============================================================================
// USER MODELS
// ============================================================================

/// Body of `POST /users`: an email plus whatever the client sends along
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub profile: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub profile: Document,
}

// ============================================================================
// WRITE ACKNOWLEDGEMENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

impl From<InsertOutcome> for InsertAck {
    fn from(outcome: InsertOutcome) -> Self {
        Self { acknowledged: true, inserted_id: outcome.inserted_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl From<UpdateOutcome> for UpdateAck {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            acknowledged: true,
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
        }
    }
}

/// Generic `{ "success": true }` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<DocumentId>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true, inserted_id: None }
    }
}
