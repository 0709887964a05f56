//! HTTP 路由与处理函数

use std::sync::Arc;

use actix_web::{dev::HttpServiceFactory, guard, http::header, middleware::DefaultHeaders, web};

use crate::api::constants::{CORS_ALLOWED_METHODS, MAX_PAYLOAD_BYTES};
use crate::api::middleware::{AccessAuth, AccessGate};
use crate::services::{LinkRepository, RedirectResolver};
use crate::storage::KvStore;

pub mod helpers;
pub mod links;
pub mod redirect;
pub mod types;

pub use links::{create_link, delete_link, list_links, preflight, update_link};
pub use redirect::redirect;

/// Shared per-application state handed to handlers as `web::Data<AppState>`.
pub struct AppState {
    pub repository: LinkRepository,
    pub resolver: RedirectResolver,
}

impl AppState {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            repository: LinkRepository::new(store.clone()),
            resolver: RedirectResolver::new(store),
        }
    }
}

/// CORS headers applied to every `/api` response, errors included.
fn cors_headers(assertion_header: &str) -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOWED_METHODS))
        .add((
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            format!("Content-Type, {}", assertion_header),
        ))
}

/// `/api` 路由
///
/// - OPTIONS /api/* - 预检，无需认证
/// - GET/POST /api/links - 列表 / 创建
/// - PUT/DELETE /api/links/{key} - 更新 / 删除
/// - 其余 /api 请求返回 404，无需认证
pub fn api_routes(gate: &AccessGate) -> impl HttpServiceFactory + use<> {
    let auth = || AccessAuth::new(gate.clone());

    web::scope("/api")
        .wrap(cors_headers(gate.header_name()))
        .app_data(helpers::json_config())
        .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
        // 预检必须在其它资源之前匹配
        .service(
            web::resource("/{tail:.*}")
                .guard(guard::Options())
                .to(preflight),
        )
        .service(
            web::resource("/links")
                .route(web::get().to(list_links).wrap(auth()))
                .route(web::post().to(create_link).wrap(auth()))
                .default_service(web::to(helpers::not_found)),
        )
        .service(
            web::resource("/links/{key}")
                .route(web::put().to(update_link).wrap(auth()))
                .route(web::delete().to(delete_link).wrap(auth()))
                .default_service(web::to(helpers::not_found)),
        )
        .default_service(web::to(helpers::not_found))
}

/// Register the management API and the redirect catch-all.
///
/// Used by the server and by the HTTP tests so both see the same routing.
pub fn configure_app(
    state: web::Data<AppState>,
    gate: AccessGate,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(state)
            .service(api_routes(&gate))
            // 通配路由放在最后
            .route("/{key:.*}", web::get().to(redirect))
            .route("/{key:.*}", web::head().to(redirect));
    }
}
