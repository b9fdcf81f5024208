//! Authentication and permission tests
//!
//! Tests for token handling and the permission string model

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims mirror of the backend token payload
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role_id: String,
    permissions: Vec<String>,
    exp: i64,
    iat: i64,
}

fn make_claims(expires_in_seconds: i64) -> Claims {
    let now = Utc::now();
    Claims {
        sub: "6f2a2a1e-12f9-4a4e-9a49-0b6f4e5a0001".to_string(),
        role_id: "6f2a2a1e-12f9-4a4e-9a49-0b6f4e5a0002".to_string(),
        permissions: vec![
            "movements:create".to_string(),
            "movements:read".to_string(),
            "products:read".to_string(),
        ],
        iat: now.timestamp(),
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp(),
    }
}

#[cfg(test)]
mod token_tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key";

    #[test]
    fn token_round_trip_preserves_claims() {
        let claims = make_claims(3600);
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.role_id, claims.role_id);
        assert_eq!(decoded.permissions, claims.permissions);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the default validation leeway
        let claims = make_claims(-3600);
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET),
            &Validation::default(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let claims = make_claims(3600);
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET),
            &Validation::default(),
        );

        assert!(result.is_err());
    }
}

#[cfg(test)]
mod password_tests {
    /// Low cost keeps the test fast; the backend uses bcrypt's default
    const TEST_COST: u32 = 4;

    #[test]
    fn password_hash_round_trip() {
        let hash = bcrypt::hash("correct horse battery staple", TEST_COST).unwrap();
        assert!(bcrypt::verify("correct horse battery staple", &hash).unwrap());
        assert!(!bcrypt::verify("wrong password", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = bcrypt::hash("segredo123", TEST_COST).unwrap();
        let second = bcrypt::hash("segredo123", TEST_COST).unwrap();
        assert_ne!(first, second);
    }
}

#[cfg(test)]
mod permission_tests {
    /// Permission strings follow the "resource:action" convention
    fn has_permission(permissions: &[String], resource: &str, action: &str) -> bool {
        permissions.contains(&format!("{}:{}", resource, action))
    }

    #[test]
    fn permission_matching_is_exact() {
        let permissions = vec![
            "movements:create".to_string(),
            "movements:read".to_string(),
        ];

        assert!(has_permission(&permissions, "movements", "create"));
        assert!(!has_permission(&permissions, "movements", "delete"));
        assert!(!has_permission(&permissions, "products", "create"));
    }

    #[test]
    fn resource_and_action_do_not_cross_match() {
        let permissions = vec!["products:read".to_string()];

        assert!(!has_permission(&permissions, "read", "products"));
        assert!(!has_permission(&permissions, "products", ""));
    }
}
