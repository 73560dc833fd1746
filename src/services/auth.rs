// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{common::error::AppError, models::auth::Claims};

/// Valida os tokens emitidos pelo provedor de identidade.
/// Usuários e senhas não vivem neste serviço.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("🔒 Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    // Simula o provedor de identidade
    fn issue_token(secret: &str, user_id: i64, name: Option<String>, ttl_hours: i64) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            name,
            exp: (now + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn issued_token_round_trips() {
        let auth = AuthService::new("segredo".into());
        let token = issue_token("segredo", 7, Some("Ana".into()), 1);

        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn foreign_or_expired_tokens_are_rejected() {
        let ours = AuthService::new("segredo".into());

        let token = issue_token("outro", 1, None, 1);
        assert!(matches!(ours.validate_token(&token), Err(AppError::InvalidToken)));

        let expired = issue_token("segredo", 1, None, -2);
        assert!(matches!(ours.validate_token(&expired), Err(AppError::InvalidToken)));
    }
}
