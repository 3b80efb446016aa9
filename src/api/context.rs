// Request-scoped state for API handling
// The body is read once by the connection layer and normalized at most once here

use super::content::{self, ContentKind, Payload};
use crate::logger;
use hyper::body::Bytes;
use hyper::Method;
use tokio::sync::OnceCell;

/// Everything an API handler needs from the incoming request
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    content_type: Option<String>,
    body: Bytes,
    payload: OnceCell<Option<Payload>>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, content_type: Option<String>, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            content_type,
            body,
            payload: OnceCell::new(),
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        ContentKind::classify(self.content_type.as_deref())
    }

    /// Normalized body, or `None` when it cannot be understood
    pub async fn payload(&self) -> Option<&Payload> {
        self.payload
            .get_or_init(|| async {
                let content_type = self.content_type.as_deref().unwrap_or_default();
                match content::normalize(self.content_kind(), content_type, self.body.clone()).await {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        logger::log_warning(&format!(
                            "Rejected {} {} body: {e}",
                            self.method, self.path
                        ));
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}
