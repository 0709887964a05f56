//! Management API handlers
//!
//! Every handler here sits behind [`crate::api::middleware::AccessAuth`], so
//! an [`Identity`] is always present in the request extensions.

use actix_web::{HttpResponse, web};
use tracing::debug;

use crate::auth::Identity;

use super::AppState;
use super::helpers::error_from_linkmap;
use super::types::{CreateLinkRequest, LinksBody, MutationBody, UpdateLinkRequest};

/// `GET /api/links`
pub async fn list_links(state: web::Data<AppState>, identity: web::ReqData<Identity>) -> HttpResponse {
    debug!("{} listing links", identity.email);
    match state.repository.list().await {
        Ok(links) => HttpResponse::Ok().json(LinksBody { links }),
        Err(e) => error_from_linkmap(&e),
    }
}

/// `POST /api/links`
pub async fn create_link(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    body: web::Json<CreateLinkRequest>,
) -> HttpResponse {
    let CreateLinkRequest { key, url } = body.into_inner();
    let key = key.unwrap_or_default();
    let url = url.unwrap_or_default();

    match state.repository.create(&key, &url, &identity).await {
        Ok(link) => HttpResponse::Created().json(MutationBody::new(link)),
        Err(e) => error_from_linkmap(&e),
    }
}

/// `PUT /api/links/{key}`
pub async fn update_link(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    key: web::Path<String>,
    body: web::Json<UpdateLinkRequest>,
) -> HttpResponse {
    let url = body.into_inner().url.unwrap_or_default();

    match state.repository.update(&key, &url, &identity).await {
        Ok(link) => HttpResponse::Ok().json(MutationBody::new(link)),
        Err(e) => error_from_linkmap(&e),
    }
}

/// `DELETE /api/links/{key}`
pub async fn delete_link(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    key: web::Path<String>,
) -> HttpResponse {
    debug!("{} deleting '{}'", identity.email, key);
    match state.repository.delete(&key).await {
        Ok(link) => HttpResponse::Ok().json(MutationBody::new(link)),
        Err(e) => error_from_linkmap(&e),
    }
}

/// `OPTIONS /api/*`: CORS headers come from the scope, body stays empty.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}
