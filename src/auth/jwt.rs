use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Decodes and validates an access token. Refresh tokens are rejected:
/// attendance endpoints only accept short-lived access tokens.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("refresh token cannot be used here".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub const SECRET: &str = "test-secret";

    pub fn token(employee_id: Option<u64>, token_type: TokenType) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize
            + 900;
        let claims = Claims {
            user_id: 1,
            sub: "worker".into(),
            role: 3,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
            employee_id,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }
}
