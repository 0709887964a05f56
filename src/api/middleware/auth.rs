use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::HeaderMap,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::constants::UNAUTHORIZED_MESSAGE;
use crate::api::services::types::ErrorBody;
use crate::auth::{AuthError, Identity, TokenValidator};

/// Which header carries the assertion, and who checks it.
#[derive(Clone)]
pub struct AccessGate {
    header: String,
    validator: Arc<dyn TokenValidator>,
}

impl AccessGate {
    pub fn new(header: impl Into<String>, validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            header: header.into(),
            validator,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header
    }

    pub fn validator_name(&self) -> &'static str {
        self.validator.name()
    }

    /// Validate the assertion found in `headers`.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = match headers.get(self.header.as_str()) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| AuthError::malformed("header is not visible ASCII"))?,
            ),
            None => None,
        };
        self.validator.validate(token.map(str::trim))
    }
}

/// Per-route guard for the management API.
///
/// On success the caller's [`Identity`] is placed in the request extensions
/// (extract it with `web::ReqData<Identity>`). On failure the request never
/// reaches the handler and a 401 is returned.
#[derive(Clone)]
pub struct AccessAuth {
    gate: AccessGate,
}

impl AccessAuth {
    pub fn new(gate: AccessGate) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessAuthMiddleware {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct AccessAuthMiddleware<S> {
    service: Rc<S>,
    gate: AccessGate,
}

impl<S, B> AccessAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_unauthorized(req: ServiceRequest, err: &AuthError) -> ServiceResponse<EitherBody<B>> {
        info!(
            reason = err.reason(),
            path = %req.path(),
            "Access denied: {}",
            err
        );
        req.into_response(
            HttpResponse::Unauthorized()
                .json(ErrorBody::new(UNAUTHORIZED_MESSAGE))
                .map_into_right_body(),
        )
    }
}

impl<S, B> Service<ServiceRequest> for AccessAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.gate.authorize(req.headers()) {
            Ok(identity) => {
                debug!(
                    "Authenticated {} via {} validator",
                    identity.email,
                    self.gate.validator_name()
                );
                req.extensions_mut().insert(identity);
                let srv = self.service.clone();
                Box::pin(async move {
                    let res = srv.call(req).await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                let response = Self::handle_unauthorized(req, &e);
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
