use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, web, HttpMessage,
};
use futures::{future::LocalBoxFuture, FutureExt};
use std::{
    future::{ready, Ready},
    rc::Rc,
    task::{Context, Poll},
};
use tracing::warn;
use uuid::Uuid;

use crate::domain::entities::user_context::UserContext;
use crate::repositories::authentication_jwt_repository::AuthenticationJwtRepository;

/// Middleware responsible for resolving the caller identity from the
/// Authorization header.
///
/// The service is usable without an account: a missing, malformed or expired
/// token degrades the request to an anonymous caller instead of rejecting it.
/// Handlers that do need an account check the extracted [`UserContext`].
pub struct UserContextMiddleware<S> {
    service: Rc<S>,
    auth_repository: web::Data<AuthenticationJwtRepository>,
}

impl<S> UserContextMiddleware<S> {
    fn resolve_user_context(&self, req: &ServiceRequest) -> UserContext {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        let token = match token {
            Some(token) => token,
            None => return UserContext::anonymous(),
        };

        let claims = match self.auth_repository.decode_token(token) {
            Ok(claims) => claims,
            Err(error) => {
                warn!(?error, "Could not decode access token, continuing as anonymous");
                return UserContext::anonymous();
            }
        };

        match Uuid::parse_str(&claims.sub) {
            Ok(user_id) => UserContext::authenticated(user_id, claims.premium),
            Err(error) => {
                warn!(?error, "Token subject is not a valid uuid, continuing as anonymous");
                UserContext::anonymous()
            }
        }
    }
}

impl<S> Service<ServiceRequest> for UserContextMiddleware<S>
where
    S: Service<
            ServiceRequest,
            Response = ServiceResponse<actix_web::body::BoxBody>,
            Error = actix_web::Error,
        > + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, actix_web::Error>>;

    /// Polls the readiness of the wrapped service.
    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    /// Handles incoming requests.
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user_context = self.resolve_user_context(&req);

        let srv = Rc::clone(&self.service);

        async move {
            req.extensions_mut().insert::<UserContext>(user_context);

            let res = srv.call(req).await?;
            Ok(res)
        }
        .boxed_local()
    }
}

/// Middleware factory extracting the caller identity for every request.
pub struct ExtractUserContext {
    auth_repository: web::Data<AuthenticationJwtRepository>,
}

impl ExtractUserContext {
    pub fn new(auth_repository: web::Data<AuthenticationJwtRepository>) -> Self {
        Self { auth_repository }
    }
}

impl<S> Transform<S, ServiceRequest> for ExtractUserContext
where
    S: Service<
            ServiceRequest,
            Response = ServiceResponse<actix_web::body::BoxBody>,
            Error = actix_web::Error,
        > + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = actix_web::Error;
    type Transform = UserContextMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    /// Creates and returns a new UserContextMiddleware wrapped in a Result.
    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserContextMiddleware {
            service: Rc::new(service),
            auth_repository: self.auth_repository.clone(),
        }))
    }
}
