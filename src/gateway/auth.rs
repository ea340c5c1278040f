//! Bearer-token validation for the `authenticate` handshake/inbound op.
//! HS256 JWTs with a `sub` claim carrying the user id, the scheme the
//! socket-serving repos in the retrieval pack use for the same purpose.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::gateway::connection::Role;

#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    sub: String,
    /// Standard JWT expiry, seconds since epoch. Required: an
    /// unexpiring bearer credential is never acceptable on a public
    /// socket endpoint.
    exp: usize,
    #[serde(default)]
    admin: bool,
}

pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

pub fn validate_token(token: &str, secret: &str) -> Option<Identity> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();
    let data = decode::<Claims>(token, &key, &validation).ok()?;
    let role = if data.claims.admin { Role::Admin } else { Role::User };
    Some(Identity { user_id: data.claims.sub, role })
}
