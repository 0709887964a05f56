//! API 模块常量定义

/// 401 响应体中的固定提示，不区分具体失败原因
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. Please authenticate via the access proxy.";

pub const NOT_FOUND_MESSAGE: &str = "Not found";

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON body";

/// CORS `Access-Control-Allow-Methods`
pub const CORS_ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// 请求体上限 (64 KiB)
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
