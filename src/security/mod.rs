use crate::config::SecurityConfig;
use crate::error::Error;
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

/// Owner signature claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OwnerClaims {
    /// Subject (reporting user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Issues and checks the signatures that let a reporter delete their own
/// events through the public endpoint
pub struct SecurityService {
    config: SecurityConfig,
}

impl SecurityService {
    /// Create a new security service
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Sign a user ID
    pub fn sign_owner(&self, user_id: i64) -> Result<String> {
        let now = Utc::now();
        let ttl = i64::try_from(self.config.signature_ttl_days)
            .ok()
            .and_then(Duration::try_days)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Owner token lifetime out of range: {} days",
                    self.config.signature_ttl_days
                ))
            })?;
        let expiration = now.checked_add_signed(ttl).ok_or_else(|| {
            Error::Config(format!(
                "Owner token lifetime out of range: {} days",
                self.config.signature_ttl_days
            ))
        })?;

        let claims = OwnerClaims {
            sub: user_id.to_string(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret_key.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("Failed to sign owner token: {}", e)))?;

        Ok(token)
    }

    /// True if `signature` was issued by this service for `user_id` and has
    /// not expired
    pub fn verify_owner(&self, user_id: i64, signature: &str) -> bool {
        let decoded = decode::<OwnerClaims>(
            signature,
            &DecodingKey::from_secret(self.config.secret_key.as_bytes()),
            &Validation::default(),
        );

        match decoded {
            Ok(data) => data.claims.sub == user_id.to_string(),
            Err(e) => {
                debug!("Rejected owner signature for {}: {}", user_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> SecurityService {
        SecurityService::new(SecurityConfig {
            secret_key: secret.to_string(),
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn signature_round_trip() -> Result<()> {
        let security = service("alpha");
        let sig = security.sign_owner(42)?;
        assert!(security.verify_owner(42, &sig));
        Ok(())
    }

    #[test]
    fn signature_is_bound_to_user() -> Result<()> {
        let security = service("alpha");
        let sig = security.sign_owner(42)?;
        assert!(!security.verify_owner(43, &sig));
        Ok(())
    }

    #[test]
    fn signature_is_bound_to_secret() -> Result<()> {
        let sig = service("alpha").sign_owner(42)?;
        assert!(!service("beta").verify_owner(42, &sig));
        Ok(())
    }

    #[test]
    fn oversized_lifetime_is_a_config_error() {
        let security = SecurityService::new(SecurityConfig {
            secret_key: "alpha".to_string(),
            signature_ttl_days: 1_000_000_000,
            ..SecurityConfig::default()
        });
        let err = security.sign_owner(1).err().map(|e| e.downcast::<Error>());
        assert!(matches!(err, Some(Ok(Error::Config(_)))));

        let security = SecurityService::new(SecurityConfig {
            signature_ttl_days: u64::MAX,
            ..SecurityConfig::default()
        });
        assert!(security.sign_owner(1).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let security = service("alpha");
        assert!(!security.verify_owner(42, ""));
        assert!(!security.verify_owner(42, "not-a-token"));
    }

    #[test]
    fn expired_signature_is_rejected() -> Result<()> {
        let security = SecurityService::new(SecurityConfig {
            secret_key: "alpha".to_string(),
            signature_ttl_days: 0,
            ..SecurityConfig::default()
        });
        let claims = OwnerClaims {
            sub: "42".to_string(),
            exp: (Utc::now() - Duration::days(2)).timestamp() as usize,
            iat: (Utc::now() - Duration::days(3)).timestamp() as usize,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"alpha"),
        )?;
        assert!(!security.verify_owner(42, &stale));
        Ok(())
    }
}
