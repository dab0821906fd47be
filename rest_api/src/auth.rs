// rest_api/src/auth.rs

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use models::medical::Actor;

use crate::{AppState, RestApiError};

/// Who is calling: the raw `Authorization` header and the client address,
/// preferring the first `X-Forwarded-For` hop over the socket peer.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub authorization: Option<String>,
    pub ip: Option<String>,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Caller {
            authorization,
            ip: forwarded.or(peer),
        })
    }
}

impl Caller {
    /// Resolves the acting staff member, requiring `permission`.
    pub fn authorize(&self, state: &AppState, permission: &str) -> Result<Actor, RestApiError> {
        let mut actor = security::authorize(
            self.authorization.as_deref(),
            &state.jwt_secret,
            &state.roles,
            permission,
        )?;
        actor.ip = self.ip.clone();
        Ok(actor)
    }
}
