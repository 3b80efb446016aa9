//! Content negotiation module
//!
//! Classifies the request `Content-Type` and normalizes JSON, form-urlencoded
//! and multipart bodies into a single [`Payload`] value.

use crate::store::Document;
use hyper::body::Bytes;
use serde_json::{Map, Value};
use std::convert::Infallible;
use thiserror::Error;

/// Supported request encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    FormUrlEncoded,
    Multipart,
    Unsupported,
}

impl ContentKind {
    /// Classify a `Content-Type` header value (case-insensitive substring match).
    /// A missing header is treated as `text/plain`.
    pub fn classify(content_type: Option<&str>) -> Self {
        let value = content_type.unwrap_or("text/plain").to_ascii_lowercase();
        if value.contains("application/json") {
            Self::Json
        } else if value.contains("application/x-www-form-urlencoded") {
            Self::FormUrlEncoded
        } else if value.contains("multipart/form-data") {
            Self::Multipart
        } else {
            Self::Unsupported
        }
    }

    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// A form field after flattening
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl FieldValue {
    /// A single value unwraps to a scalar; several keep their order
    pub fn from_values(values: Vec<String>) -> Self {
        match <[String; 1]>::try_from(values) {
            Ok([single]) => Self::Scalar(single),
            Err(values) => Self::Sequence(values),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(field: FieldValue) -> Self {
        match field {
            FieldValue::Scalar(s) => Self::String(s),
            FieldValue::Sequence(values) => Self::Array(values.into_iter().map(Self::String).collect()),
        }
    }
}

/// Normalized request body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Scalar(Value),
    Sequence(Vec<Value>),
    Object(Document),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(map),
            Value::Array(items) => Self::Sequence(items),
            other => Self::Scalar(other),
        }
    }
}

/// Documents to create, remembering the shape the client sent
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    One(Document),
    Many(Vec<Document>),
}

impl Payload {
    /// Interpret the payload as documents to create.
    /// Scalars, and sequences holding anything but objects, are rejected.
    pub fn into_batch(self) -> Option<Batch> {
        match self {
            Self::Object(doc) => Some(Batch::One(doc)),
            Self::Sequence(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(doc) => Some(doc),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Batch::Many),
            Self::Scalar(_) => None,
        }
    }

    /// Interpret the payload as a single replacement document
    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Object(doc) => Some(doc),
            Self::Sequence(_) | Self::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unsupported content type")]
    Unsupported,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("multipart field '{0}' is not UTF-8 text")]
    NotText(String),
}

/// Normalize a raw body according to its content kind
pub async fn normalize(
    kind: ContentKind,
    content_type: &str,
    body: Bytes,
) -> Result<Payload, ContentError> {
    match kind {
        ContentKind::Json => Ok(Payload::from(serde_json::from_slice::<Value>(&body)?)),
        ContentKind::FormUrlEncoded => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)?;
            Ok(Payload::Object(flatten_fields(pairs)))
        }
        ContentKind::Multipart => {
            let pairs = parse_multipart(content_type, body).await?;
            Ok(Payload::Object(flatten_fields(pairs)))
        }
        ContentKind::Unsupported => Err(ContentError::Unsupported),
    }
}

/// Group repeated field names, keeping first-seen order
fn flatten_fields(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in pairs {
        match grouped.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => grouped.push((name, vec![value])),
        }
    }

    grouped
        .into_iter()
        .map(|(name, values)| (name, Value::from(FieldValue::from_values(values))))
        .collect()
}

async fn parse_multipart(
    content_type: &str,
    body: Bytes,
) -> Result<Vec<(String, String)>, ContentError> {
    let boundary = multer::parse_boundary(content_type)?;
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut pairs = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        let data = field.bytes().await?;
        let text = String::from_utf8(data.to_vec()).map_err(|_| ContentError::NotText(name.clone()))?;
        pairs.push((name, text));
    }
    Ok(pairs)
}
