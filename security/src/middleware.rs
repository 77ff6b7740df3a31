// security/src/middleware.rs

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use log::debug;

use models::medical::Principal;

use crate::roles::AllowedRoles;
use crate::{AuthError, TokenAuthority};

/// State for [`require_auth`]: who signs tokens and which roles may pass.
#[derive(Clone)]
pub struct AuthGate {
    authority: Arc<TokenAuthority>,
    allowed: AllowedRoles,
}

impl AuthGate {
    pub fn new(authority: Arc<TokenAuthority>, allowed: AllowedRoles) -> Self {
        AuthGate { authority, allowed }
    }

    /// Resolves the caller from the `Authorization` header. No account lookup
    /// happens here; the token is trusted until it expires.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.split_whitespace().nth(1))
            .ok_or(AuthError::InvalidHeader)?;

        let claims = self.authority.verify(token)?;
        if !self.allowed.permits(claims.role) {
            debug!("{} {} rejected by role gate", claims.role, claims.id);
            return Err(AuthError::Forbidden);
        }
        Ok(claims.principal())
    }
}

/// Axum middleware: rejects unauthenticated or unauthorised requests and
/// stores the [`Principal`] in the request extensions.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = gate.authenticate(request.headers())?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Handler argument for the caller admitted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::MissingHeader)
    }
}
