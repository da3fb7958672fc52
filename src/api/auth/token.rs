use actix_web::{HttpRequest, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::ApiError;
use crate::db::id::RecordId;

/// Claims carried by every bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Sign a token for the given account
    pub fn issue(&self, user_id: &RecordId) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ApiError::unauthenticated("Token is not valid")
            })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthenticated("No token, authorization denied"))?
        .to_str()
        .map_err(|_| ApiError::unauthenticated("Malformed authorization header"))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim().to_string())
        }
        _ => Err(ApiError::unauthenticated("Malformed authorization header")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let keys = TokenKeys::new("top-secret", 1);
        let id = RecordId::generate();

        let token = keys.issue(&id).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, id.to_string());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenKeys::new("one", 1).issue(&RecordId::generate()).unwrap();
        let err = TokenKeys::new("two", 1).verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("top-secret", 1);
        let past = Utc::now() - Duration::hours(2);
        let token = keys
            .sign(&Claims {
                sub: RecordId::generate().to_string(),
                iat: past.timestamp(),
                exp: (past + Duration::minutes(30)).timestamp(),
            })
            .unwrap();

        assert!(matches!(keys.verify(&token), Err(ApiError::Unauthenticated(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let keys = TokenKeys::new("top-secret", 1);
        assert!(keys.verify("not.a.jwt").is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(bearer_token(&req).is_err());

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert!(bearer_token(&req).is_err());

        let req = TestRequest::default().to_http_request();
        assert!(matches!(bearer_token(&req), Err(ApiError::Unauthenticated(_))));
    }
}
