//! Read the signed-in user out of a JWT payload.
//!
//! The signature is not checked, the token came straight from the identity endpoint over TLS.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
struct Claims {
    upn: Option<String>,
    unique_name: Option<String>,
    email: Option<String>,
    preferred_username: Option<String>,
    oid: Option<String>,
    tid: Option<String>,
}

fn decode_claims(jwt: &str) -> Option<Claims> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| log::debug!("jwt payload not base64url: {e}"))
        .ok()?;
    serde_json::from_slice(&bytes)
        .map_err(|e| log::debug!("jwt payload not json: {e}"))
        .ok()
}

/// User identity claim, first of upn, unique_name, email, preferred_username, oid.
pub fn user_id(jwt: &str) -> Option<String> {
    let claims = decode_claims(jwt)?;
    claims
        .upn
        .or(claims.unique_name)
        .or(claims.email)
        .or(claims.preferred_username)
        .or(claims.oid)
}

/// Tenant the token was issued by.
pub fn tenant_id(jwt: &str) -> Option<String> {
    decode_claims(jwt)?.tid
}

#[cfg(test)]
pub(crate) fn fake_jwt(payload: &serde_json::Value) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}
