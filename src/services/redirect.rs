use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::{KvStore, is_metadata_key};

/// Shown on the miss page when the requested key is empty.
pub const EMPTY_KEY_PLACEHOLDER: &str = "very null, like, nothing's there...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Redirect to the stored URL, untouched.
    Found(String),
    /// Nothing to redirect to; carries the key as it should be displayed.
    NotFound(String),
}

/// Single-key lookup against the primary slots. No caching.
#[derive(Clone)]
pub struct RedirectResolver {
    store: Arc<dyn KvStore>,
}

impl RedirectResolver {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, path: &str) -> RedirectOutcome {
        let key = candidate_key(path);

        if key.is_empty() {
            return RedirectOutcome::NotFound(EMPTY_KEY_PLACEHOLDER.to_string());
        }
        if is_metadata_key(&key) {
            debug!("Refusing to resolve metadata key '{}'", key);
            return RedirectOutcome::NotFound(key.into_owned());
        }

        match self.store.get(&key).await {
            Ok(Some(target)) if is_redirectable(&target) => {
                debug!("Redirect '{}' -> {}", key, target);
                RedirectOutcome::Found(target)
            }
            Ok(Some(target)) => {
                // 旧数据里可能存在无法放进 Location 头的值
                warn!("Stored target for '{}' is not a valid redirect: {:?}", key, target);
                RedirectOutcome::NotFound(key.into_owned())
            }
            Ok(None) => {
                debug!("Redirect key not found: {}", key);
                RedirectOutcome::NotFound(key.into_owned())
            }
            Err(e) => {
                // 存储故障与未命中对调用方一视同仁
                warn!("Redirect lookup for '{}' failed: {}", key, e);
                RedirectOutcome::NotFound(key.into_owned())
            }
        }
    }
}

/// Whether `target` can be sent verbatim in a `Location` header.
///
/// `Url::parse` silently drops tabs and newlines, so a parseable URL may
/// still carry ASCII control characters.
pub fn is_redirectable(target: &str) -> bool {
    !target.is_empty() && !target.chars().any(|c| c.is_ascii_control())
}

/// Strip one leading `/` and percent-decode. Invalid encodings are kept raw.
fn candidate_key(path: &str) -> Cow<'_, str> {
    let raw = path.strip_prefix('/').unwrap_or(path);
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}
