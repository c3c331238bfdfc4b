/// Token service: issues and verifies the two classes of signed,
/// expiring bearer tokens (access and refresh).
use crate::{
    config::AuthConfig,
    error::{ApiError, ApiResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which signing domain a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claims carried by both token classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id
    pub sub: String,
    /// Unique token id; consecutively issued tokens always differ
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh token pair issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// One signing domain: its keys and time-to-live
struct SigningDomain {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningDomain {
    fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }
}

/// Issues and verifies access and refresh tokens.
///
/// The two domains are configured independently (secret and TTL each), so a
/// token signed for one domain never verifies in the other.
pub struct TokenService {
    access: SigningDomain,
    refresh: SigningDomain,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: SigningDomain::new(&config.access.secret, config.access.ttl_seconds),
            refresh: SigningDomain::new(&config.refresh.secret, config.refresh.ttl_seconds),
        }
    }

    fn domain(&self, kind: TokenKind) -> &SigningDomain {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Issue a signed token for an account in the given domain
    pub fn issue(&self, kind: TokenKind, account_id: &str) -> ApiResult<String> {
        let domain = self.domain(kind);
        let now = Utc::now();

        let claims = TokenClaims {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + domain.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &domain.encoding)
            .map_err(|e| ApiError::Jwt(format!("Failed to generate {} token: {}", kind.as_str(), e)))
    }

    /// Issue a fresh access/refresh pair for an account
    pub fn issue_pair(&self, account_id: &str) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, account_id)?,
            refresh_token: self.issue(TokenKind::Refresh, account_id)?,
        })
    }

    /// Verify a token against the given domain and return its claims.
    ///
    /// Fails with an authentication error on bad signature, malformed
    /// payload, or expiry.
    pub fn verify(&self, kind: TokenKind, token: &str) -> ApiResult<TokenClaims> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<TokenClaims>(token, &self.domain(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("{} token verification failed: {}", kind.as_str(), e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        ApiError::Authentication("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        ApiError::Authentication("Invalid token signature".to_string())
                    }
                    _ => ApiError::Authentication("Invalid token".to_string()),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;

    fn test_service() -> TokenService {
        TokenService::new(&AuthConfig {
            access: TokenConfig {
                secret: "access-secret-access-secret-1234".to_string(),
                ttl_seconds: 3600,
            },
            refresh: TokenConfig {
                secret: "refresh-secret-refresh-secret-12".to_string(),
                ttl_seconds: 864000,
            },
        })
    }

    #[test]
    fn issue_and_verify_access_token() {
        let service = test_service();
        let token = service.issue(TokenKind::Access, "account-1").unwrap();

        let claims = service.verify(TokenKind::Access, &token).unwrap();
        assert_eq!(claims.sub, "account-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn domains_are_independent() {
        let service = test_service();
        let access = service.issue(TokenKind::Access, "account-1").unwrap();
        let refresh = service.issue(TokenKind::Refresh, "account-1").unwrap();

        // A token never verifies in the other domain
        assert!(service.verify(TokenKind::Refresh, &access).is_err());
        assert!(service.verify(TokenKind::Access, &refresh).is_err());
    }

    #[test]
    fn consecutive_tokens_differ() {
        let service = test_service();
        let first = service.issue(TokenKind::Refresh, "account-1").unwrap();
        let second = service.issue(TokenKind::Refresh, "account-1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn expired_token_rejected() {
        let service = TokenService::new(&AuthConfig {
            access: TokenConfig {
                secret: "access-secret-access-secret-1234".to_string(),
                // Far enough in the past to clear the default leeway
                ttl_seconds: -300,
            },
            refresh: TokenConfig {
                secret: "refresh-secret-refresh-secret-12".to_string(),
                ttl_seconds: 864000,
            },
        });

        let token = service.issue(TokenKind::Access, "account-1").unwrap();
        let err = service.verify(TokenKind::Access, &token).unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn tampered_token_rejected() {
        let service = test_service();
        let token = service.issue(TokenKind::Access, "account-1").unwrap();
        let mut tampered = token.clone();
        tampered.pop();

        assert!(service.verify(TokenKind::Access, &tampered).is_err());
    }
}
