//! The actor context attached to mutating requests.
//!
//! Authentication proper lives outside this service; requests arrive with
//! the acting user's name and role as headers, and handlers consult the
//! resulting [ActorContext] for capability checks before mutating the
//! ledger.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// The header carrying the acting user's name.
pub const ACTOR_HEADER: &str = "x-actor";
/// The header carrying the acting user's role.
pub const ROLE_HEADER: &str = "x-actor-role";

/// The name recorded when a request does not identify its actor.
const UNKNOWN_ACTOR: &str = "Unknown";

/// What a request's actor is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// May create, edit and delete transactions.
    Admin,
    /// May create and edit transactions, but not delete them.
    Member,
}

/// The person performing a mutating request, for capability checks and the
/// audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorContext {
    /// The acting user's name, as recorded in the audit trail.
    pub name: String,
    /// The acting user's role.
    pub role: Role,
}

impl ActorContext {
    /// Whether the actor may delete transactions.
    pub fn can_delete(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ACTOR)
            .to_owned();

        let role = match parts.headers.get(ROLE_HEADER).and_then(|value| value.to_str().ok()) {
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Member,
        };

        Ok(ActorContext { name, role })
    }
}
