use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::Role;

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub role: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies the bearer tokens handed out by the token exchange.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_minutes: i64,
    refresh_ttl_days: i64,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str, access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_minutes,
            refresh_ttl_days,
        }
    }

    pub fn issue_pair(&self, user_id: i32, role: Role) -> Result<TokenPair> {
        let now = chrono::Utc::now();

        let access = self.sign(
            user_id,
            role,
            TOKEN_TYPE_ACCESS,
            now.timestamp(),
            (now + chrono::Duration::minutes(self.access_ttl_minutes)).timestamp(),
        )?;
        let refresh = self.sign(
            user_id,
            role,
            TOKEN_TYPE_REFRESH,
            now.timestamp(),
            (now + chrono::Duration::days(self.refresh_ttl_days)).timestamp(),
        )?;

        Ok(TokenPair { access, refresh })
    }

    /// Verify a bearer token and return its claims. Refresh tokens are not
    /// valid for resource access.
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .context("invalid bearer token")?;

        if data.claims.token_type != TOKEN_TYPE_ACCESS {
            anyhow::bail!("token is not an access token");
        }

        Ok(data.claims)
    }

    fn sign(&self, user_id: i32, role: Role, token_type: &str, iat: i64, exp: i64) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            role: role.as_str().to_string(),
            token_type: token_type.to_string(),
            iat,
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("unit-test-secret", 60, 30)
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let pair = signer().issue_pair(42, Role::Staff).unwrap();
        let claims = signer().verify_access(&pair.access).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "staff");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_refresh_token_rejected_for_access() {
        let pair = signer().issue_pair(1, Role::User).unwrap();
        assert!(signer().verify_access(&pair.refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = signer().issue_pair(1, Role::User).unwrap();
        let other = TokenSigner::new("a-different-secret", 60, 30);
        assert!(other.verify_access(&pair.access).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(signer().verify_access("not-a-jwt").is_err());
    }
}
