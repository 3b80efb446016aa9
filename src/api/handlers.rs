// CRUD handlers
// Each handler validates its input, then delegates to the document store

use super::content::Batch;
use super::context::RequestContext;
use super::response::ApiResponse;
use crate::store::DocumentStore;
use serde_json::Value;

/// GET /api/<collection>
pub async fn list_documents<S: DocumentStore>(store: &S, collection: &str) -> ApiResponse {
    match store.list(collection).await {
        Ok(items) => ApiResponse::ok(Value::Array(items)),
        Err(e) => ApiResponse::from_store_error(&e, collection, None),
    }
}

/// GET /api/<collection>/<id>
pub async fn get_document<S: DocumentStore>(store: &S, collection: &str, id: &str) -> ApiResponse {
    match store.get(collection, id).await {
        Ok(item) => ApiResponse::ok(item),
        Err(e) => ApiResponse::from_store_error(&e, collection, Some(id)),
    }
}

/// POST /api/<collection>
///
/// Answers with the created document, or with the created list when the
/// client sent a list.
pub async fn create_documents<S: DocumentStore>(
    store: &S,
    ctx: &RequestContext,
    collection: &str,
) -> ApiResponse {
    let Some(batch) = ctx.payload().await.cloned().and_then(|p| p.into_batch()) else {
        return ApiResponse::invalid_content_type();
    };

    let (items, single) = match batch {
        Batch::One(doc) => (vec![doc], true),
        Batch::Many(docs) => (docs, false),
    };

    match store.create(collection, items).await {
        Ok(created) => {
            let mut docs = created.into_iter().map(Value::Object);
            let body = if single {
                docs.next().unwrap_or_default()
            } else {
                Value::Array(docs.collect())
            };
            ApiResponse::created(body)
        }
        Err(e) => ApiResponse::from_store_error(&e, collection, None),
    }
}

/// PUT /api/<collection>/<id>
pub async fn replace_document<S: DocumentStore>(
    store: &S,
    ctx: &RequestContext,
    collection: &str,
    id: &str,
) -> ApiResponse {
    let Some(item) = ctx.payload().await.cloned().and_then(|p| p.into_document()) else {
        return ApiResponse::invalid_content_type();
    };

    match store.replace(collection, id, item).await {
        Ok(stored) => ApiResponse::ok(Value::Object(stored)),
        Err(e) => ApiResponse::from_store_error(&e, collection, Some(id)),
    }
}

/// DELETE /api/<collection>/<id>
pub async fn delete_document<S: DocumentStore>(store: &S, collection: &str, id: &str) -> ApiResponse {
    match store.delete(collection, id).await {
        Ok(()) => ApiResponse::no_content(),
        Err(e) => ApiResponse::from_store_error(&e, collection, Some(id)),
    }
}
