//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::types::Language;
use shared::validation::validate_email;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new user account
#[derive(Debug, Deserialize)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub preferred_language: Option<Language>,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub role_id: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub preferred_language: String,
    pub is_active: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new user account with the default operator role
    pub async fn register(&self, input: RegisterUserInput) -> AppResult<RegisterResponse> {
        validate_email(&input.email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
            message_pt: "E-mail inválido".to_string(),
        })?;

        if input.password.len() < 8 {
            return Err(AppError::Validation {
                field: "password".to_string(),
                message: "password must have at least 8 characters".to_string(),
                message_pt: "a senha deve ter pelo menos 8 caracteres".to_string(),
            });
        }

        let email = input.email.trim().to_lowercase();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let role_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE name = 'operator'")
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::Internal("default role is missing".to_string()))?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

        let language = input.preferred_language.unwrap_or_default();

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (name, email, password_hash, role_id, preferred_language)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role_id)
        .bind(language.code())
        .fetch_one(&self.db)
        .await?;

        let permissions = self.load_permissions(role_id).await?;
        let tokens = self.generate_tokens(user_id, role_id, permissions)?;

        Ok(RegisterResponse {
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        })
    }

    /// Authenticate a user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = self
            .find_user_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let permissions = self.load_permissions(user.role_id).await?;
        self.generate_tokens(user.id, user.role_id, permissions)
    }

    /// Issue a fresh token pair from a valid refresh token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let claims = self.decode_token(refresh_token)?;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, role_id, email, password_hash, name, preferred_language, is_active \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::InvalidToken);
        }

        // Re-read permissions so role changes take effect on refresh
        let permissions = self.load_permissions(user.role_id).await?;
        self.generate_tokens(user.id, user.role_id, permissions)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, role_id, email, password_hash, name, preferred_language, is_active \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn load_permissions(&self, role_id: Uuid) -> AppResult<Vec<String>> {
        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.resource || ':' || p.action
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    fn generate_tokens(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        permissions: Vec<String>,
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();

        let access_claims = Claims {
            sub: user_id.to_string(),
            role_id: role_id.to_string(),
            permissions: permissions.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
        };

        let refresh_claims = Claims {
            sub: user_id.to_string(),
            role_id: role_id.to_string(),
            permissions,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.refresh_token_expiry)).timestamp(),
        };

        let key = EncodingKey::from_secret(self.jwt_secret.as_bytes());
        let access_token = encode(&Header::default(), &access_claims, &key)
            .map_err(|e| AppError::Internal(format!("token generation failed: {}", e)))?;
        let refresh_token = encode(&Header::default(), &refresh_claims, &key)
            .map_err(|e| AppError::Internal(format!("token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    fn decode_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }
}
