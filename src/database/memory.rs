//! In-process document store.
//!
//! Mirrors the query semantics of the Postgres store closely enough to back
//! the HTTP tests and local development without a database. Mixed-type sort
//! keys rank the way JSONB does; strings compare bytewise rather than by
//! database collation.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::database::store::{
    lookup, with_id, Collection, Document, DocumentId, DocumentStore, Filter, FindOptions,
    InsertOutcome, SortDirection, StoreError, UpdateOutcome, ID_FIELD,
};

/// Documents per collection, kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<(DocumentId, Document)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(id: &DocumentId, doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::ById(wanted) => id == wanted,
        Filter::Eq { field, value } => lookup(doc, field) == Some(value),
        Filter::Contains { field, needle } => lookup(doc, field)
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

/// JSONB order: missing < null < string < number < bool < array < object
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::Bool(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<InsertOutcome, StoreError> {
        doc.remove(ID_FIELD);
        let id = DocumentId::generate();
        self.collections.write().entry(collection).or_default().push((id, doc));
        Ok(InsertOutcome { inserted_id: id })
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read();
        let Some(docs) = guard.get(&collection) else {
            return Ok(Vec::new());
        };

        let mut selected: Vec<&(DocumentId, Document)> =
            docs.iter().filter(|(id, doc)| matches(id, doc, filter)).collect();

        // stable sort keeps insertion order among equal keys
        if let Some(sort) = &options.sort {
            selected.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(lookup(a, &sort.field), lookup(b, &sort.field));
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        Ok(selected
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(id, doc)| with_id(doc.clone(), *id))
            .collect())
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut guard = self.collections.write();
        let target = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(id, doc)| matches(id, doc, filter)));

        let Some((_, doc)) = target else {
            return Ok(UpdateOutcome { matched_count: 0, modified_count: 0 });
        };

        let mut modified = false;
        for (key, value) in set {
            if key == ID_FIELD {
                continue;
            }
            if doc.get(&key) != Some(&value) {
                doc.insert(key, value);
                modified = true;
            }
        }

        Ok(UpdateOutcome { matched_count: 1, modified_count: u64::from(modified) })
    }

    async fn estimated_count(&self, collection: Collection) -> Result<u64, StoreError> {
        Ok(self.collections.read().get(&collection).map_or(0, |docs| docs.len() as u64))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::Sort;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (name, price) in [("Chicken Biryani", 12.0), ("Beef Burger", 8.5), ("chicken soup", 5.0), ("Salad", 7.25)] {
            store
                .insert_one(Collection::Foods, doc(json!({ "name": name, "price": price })))
                .await
                .unwrap();
        }
        store
    }

    fn names(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn find_preserves_insertion_order_without_sort() {
        let store = seeded().await;
        let docs = store.find(Collection::Foods, &Filter::All, &FindOptions::default()).await.unwrap();
        assert_eq!(names(&docs), ["Chicken Biryani", "Beef Burger", "chicken soup", "Salad"]);
        assert!(docs.iter().all(|d| d.contains_key(ID_FIELD)));
    }

    #[tokio::test]
    async fn contains_filter_ignores_case() {
        let store = seeded().await;
        let docs = store
            .find(Collection::Foods, &Filter::contains("name", "CHICKEN"), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(names(&docs), ["Chicken Biryani", "chicken soup"]);
    }

    #[tokio::test]
    async fn contains_filter_keeps_trailing_space() {
        let store = MemoryStore::new();
        for name in ["Fried rice", "Rice noodles"] {
            store.insert_one(Collection::Foods, doc(json!({ "name": name }))).await.unwrap();
        }
        let docs = store
            .find(Collection::Foods, &Filter::contains("name", "rice "), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(names(&docs), ["Rice noodles"]);
    }

    #[tokio::test]
    async fn mixed_type_keys_sort_like_jsonb() {
        let store = MemoryStore::new();
        for (name, price) in [
            ("bool", json!(true)),
            ("number", json!(3)),
            ("null", Value::Null),
            ("string", json!("4")),
        ] {
            store.insert_one(Collection::Foods, doc(json!({ "name": name, "price": price }))).await.unwrap();
        }
        store.insert_one(Collection::Foods, doc(json!({ "name": "missing" }))).await.unwrap();

        let options = FindOptions::default().sorted(Sort::ascending("price"));
        let docs = store.find(Collection::Foods, &Filter::All, &options).await.unwrap();
        assert_eq!(names(&docs), ["missing", "null", "string", "number", "bool"]);
    }

    #[tokio::test]
    async fn sort_skip_and_limit_compose() {
        let store = seeded().await;
        let options = FindOptions { sort: Some(Sort::ascending("price")), skip: Some(1), limit: Some(2) };
        let docs = store.find(Collection::Foods, &Filter::All, &options).await.unwrap();
        assert_eq!(names(&docs), ["Salad", "Beef Burger"]);
    }

    #[tokio::test]
    async fn eq_filter_matches_nested_field() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Foods, doc(json!({ "name": "Pho", "addBy": { "email": "a@x.io" } })))
            .await
            .unwrap();
        store
            .insert_one(Collection::Foods, doc(json!({ "name": "Ramen", "addBy": { "email": "b@x.io" } })))
            .await
            .unwrap();

        let docs = store
            .find(Collection::Foods, &Filter::equals("addBy.email", "b@x.io"), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(names(&docs), ["Ramen"]);
    }

    #[tokio::test]
    async fn update_reports_matched_and_modified() {
        let store = seeded().await;
        let first = store.find_one(Collection::Foods, &Filter::All).await.unwrap().unwrap();
        let id: DocumentId = first[ID_FIELD].as_str().unwrap().parse().unwrap();

        let outcome = store
            .update_one(Collection::Foods, &Filter::ById(id), doc(json!({ "price": 13.0 })))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched_count: 1, modified_count: 1 });

        let unchanged = store
            .update_one(Collection::Foods, &Filter::ById(id), doc(json!({ "price": 13.0 })))
            .await
            .unwrap();
        assert_eq!(unchanged, UpdateOutcome { matched_count: 1, modified_count: 0 });

        let missing = store
            .update_one(Collection::Foods, &Filter::ById(DocumentId::generate()), doc(json!({ "price": 1 })))
            .await
            .unwrap();
        assert_eq!(missing.matched_count, 0);
    }

    #[tokio::test]
    async fn insert_ignores_supplied_identifier() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one(Collection::Orders, doc(json!({ "_id": "client-made", "total": 3 })))
            .await
            .unwrap();
        let stored = store
            .find_one(Collection::Orders, &Filter::ById(outcome.inserted_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored[ID_FIELD], json!(outcome.inserted_id.to_string()));
        assert_eq!(store.estimated_count(Collection::Orders).await.unwrap(), 1);
        assert_eq!(store.estimated_count(Collection::Users).await.unwrap(), 0);
    }
}
