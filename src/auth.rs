//! Bearer-token identity.
//!
//! Supabase issues the JWTs; only the payload is decoded here (`sub`, `email`).
//! Signature verification is not performed.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialLeafError};

pub const DEMO_TOKEN: &str = "mock_token_for_demo";

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

fn unauthorized(message: impl Into<String>) -> SocialLeafError {
    SocialLeafError::Unauthorized {
        message: message.into(),
    }
}

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let header = header.ok_or_else(|| unauthorized("Missing Authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| unauthorized("Authorization header must be 'Bearer <token>'"))?;
    Ok(token)
}

/// Decode a token into the caller identity. The demo token is honoured only
/// outside production.
pub fn decode_token(token: &str, allow_demo: bool) -> Result<AuthUser> {
    if token == DEMO_TOKEN {
        if allow_demo {
            return Ok(AuthUser {
                user_id: "mock_user_id".to_string(),
                email: Some("mock@example.com".to_string()),
            });
        }
        return Err(unauthorized("Invalid token: demo token not accepted"));
    }

    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(unauthorized("Invalid token: expected three segments"));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| unauthorized(format!("Invalid token: {e}")))?;
    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| unauthorized(format!("Invalid token: {e}")))?;

    let user_id = claims
        .sub
        .filter(|s| !s.is_empty())
        .ok_or_else(|| unauthorized("Invalid token: missing user ID"))?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decodes_sub_and_email() {
        let token = token_with(r#"{"sub":"user-123","email":"a@b.co","role":"authenticated"}"#);
        let user = decode_token(&token, false).unwrap();
        assert_eq!(user.user_id, "user-123");
        assert_eq!(user.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn missing_sub_is_rejected() {
        let token = token_with(r#"{"email":"a@b.co"}"#);
        assert!(matches!(
            decode_token(&token, true),
            Err(SocialLeafError::Unauthorized { .. })
        ));
    }

    #[test]
    fn demo_token_only_outside_production() {
        assert_eq!(decode_token(DEMO_TOKEN, true).unwrap().user_id, "mock_user_id");
        assert!(decode_token(DEMO_TOKEN, false).is_err());
    }

    #[test]
    fn malformed_tokens() {
        for token in ["abc", "a.b", "a.!!!.c", "a.b.c.d"] {
            assert!(decode_token(token, true).is_err(), "{token}");
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(Some("Bearer xyz")).unwrap(), "xyz");
        assert!(bearer_token(Some("Basic xyz")).is_err());
        assert!(bearer_token(Some("Bearer   ")).is_err());
        assert!(bearer_token(None).is_err());
    }
}
