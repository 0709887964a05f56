//! 集成测试共用的辅助函数
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::web;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use linkmap::api::{AccessGate, AppState};
use linkmap::auth::UnverifiedAssertionValidator;
use linkmap::errors::Result;
use linkmap::storage::{KvListResult, KvStore, MemoryKvStore};

pub const ASSERTION_HEADER: &str = "Cf-Access-Jwt-Assertion";

/// 构造一个未签名的访问断言（仅 decode-only 校验器接受）
pub fn assertion_for(email: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    assertion_with_claims(&serde_json::json!({
        "email": email,
        "sub": format!("sub-{}", email),
        "iat": now,
        "exp": now + 600,
    }))
}

pub fn assertion_with_claims(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

/// 记录调用次数的存储包装
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryKvStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.hit();
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.hit();
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.hit();
        self.inner.delete(key).await
    }

    async fn list(&self, cursor: Option<&str>) -> Result<KvListResult> {
        self.hit();
        self.inner.list(cursor).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

/// Application state and access gate over `store`, with the decode-only validator.
pub fn app_parts(store: Arc<dyn KvStore>) -> (web::Data<AppState>, AccessGate) {
    let gate = AccessGate::new(
        ASSERTION_HEADER,
        Arc::new(UnverifiedAssertionValidator::new()),
    );
    (web::Data::new(AppState::new(store)), gate)
}
