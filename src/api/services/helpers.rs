//! API 帮助函数

use actix_web::{HttpRequest, HttpResponse, error::InternalError, error::JsonPayloadError, web};
use tracing::{error, info};

use crate::api::constants::{
    INTERNAL_ERROR_MESSAGE, INVALID_JSON_MESSAGE, MAX_PAYLOAD_BYTES, NOT_FOUND_MESSAGE,
};
use crate::errors::LinkmapError;

use super::types::ErrorBody;

/// 从 LinkmapError 构建错误响应
///
/// 4xx 原样返回错误信息；5xx 只记录日志，响应体使用通用提示。
pub fn error_from_linkmap(err: &LinkmapError) -> HttpResponse {
    let status = err.http_status();
    if err.is_client_error() {
        info!("Request rejected ({}): {}", status.as_u16(), err);
        HttpResponse::build(status).json(ErrorBody::new(err.message()))
    } else {
        error!("Request failed: {}", err.format_simple());
        HttpResponse::build(status).json(ErrorBody::new(INTERNAL_ERROR_MESSAGE))
    }
}

/// JSON 请求体解析失败统一返回 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_PAYLOAD_BYTES)
        .error_handler(json_error_handler)
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    info!("Rejected request body: {}", err);
    let response = HttpResponse::BadRequest().json(ErrorBody::new(INVALID_JSON_MESSAGE));
    InternalError::from_response(err, response).into()
}

/// 未知的 /api 路由或方法
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody::new(NOT_FOUND_MESSAGE))
}

/// 转义后嵌入 HTML
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
