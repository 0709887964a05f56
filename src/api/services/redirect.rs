use actix_web::http::StatusCode;
use actix_web::http::header::{CACHE_CONTROL, LOCATION};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::instrument;

use crate::services::RedirectOutcome;

use super::AppState;
use super::helpers::escape_html;

const NOT_FOUND_TEMPLATE: &str = include_str!("not_found.html");
const KEY_PLACEHOLDER: &str = "{{KEY_PATH}}";

/// `GET|HEAD /{key}`
#[instrument(skip(req, state), fields(path = %req.path()))]
pub async fn redirect(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match state.resolver.resolve(req.path()).await {
        RedirectOutcome::Found(target) => HttpResponse::Found()
            .insert_header((LOCATION, target))
            .finish(),
        RedirectOutcome::NotFound(display) => HttpResponse::build(StatusCode::IM_A_TEAPOT)
            .content_type("text/html; charset=utf-8")
            .insert_header((CACHE_CONTROL, "no-store"))
            .body(render_not_found(&display)),
    }
}

pub fn render_not_found(display: &str) -> String {
    NOT_FOUND_TEMPLATE.replace(KEY_PLACEHOLDER, &escape_html(display))
}
