use super::Claims;
use uuid::Uuid;

/// Authenticated caller, built from a verified JWT.
///
/// The raw token is kept so calls to the user API act on the caller's behalf.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: Uuid,

    /// User email if available
    pub email: Option<String>,

    /// User role if specified
    pub role: Option<String>,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: String,

    token: String,

    /// JWT claims
    claims: Claims,
}

impl AuthContext {
    pub fn from_claims_with_token(claims: &Claims, token: &str) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;

        Ok(Self {
            user_id,
            email: claims.email.clone(),
            role: claims.role.clone(),
            issuer: claims.iss.clone(),
            audience: claims.aud.clone(),
            token: token.to_string(),
            claims: claims.clone(),
        })
    }

    /// Get the raw JWT token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the JWT claims
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            aud: "authenticated".to_string(),
            iss: "https://auth.example.com".to_string(),
            iat: 0,
            exp: 0,
            nbf: None,
            email: Some("jdoe@example.com".to_string()),
            role: Some("authenticated".to_string()),
        }
    }

    #[test]
    fn context_keeps_the_raw_token() {
        let ctx = AuthContext::from_claims_with_token(&claims("8b5c6a36-8a3e-4a4d-9a49-1f0b6c2e7d10"), "abc").unwrap();
        assert_eq!(ctx.token(), "abc");
        assert_eq!(ctx.email.as_deref(), Some("jdoe@example.com"));
        assert_eq!(ctx.claims().aud, "authenticated");
    }

    #[test]
    fn subject_must_be_a_uuid() {
        assert!(AuthContext::from_claims_with_token(&claims("jdoe"), "abc").is_err());
    }
}
