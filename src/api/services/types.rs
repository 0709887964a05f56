//! Management API 请求/响应类型

use serde::{Deserialize, Serialize};

use crate::storage::LinkEntry;

/// 所有错误响应的统一结构 `{ "error": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// `GET /api/links`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksBody {
    pub links: Vec<LinkEntry>,
}

/// create / update / delete 的成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationBody {
    pub success: bool,
    pub link: LinkEntry,
}

impl MutationBody {
    pub fn new(link: LinkEntry) -> Self {
        Self {
            success: true,
            link,
        }
    }
}

/// `POST /api/links`
///
/// Missing or null fields deserialize to `None` and are rejected by the
/// repository as invalid input rather than as malformed JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// `PUT /api/links/{key}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLinkRequest {
    #[serde(default)]
    pub url: Option<String>,
}
