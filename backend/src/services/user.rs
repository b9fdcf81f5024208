//! User management service (admin operations)

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::types::Language;
use shared::validation::validate_email;

/// User service for administrative account management
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.role_id, r.name AS role_name, \
                            u.preferred_language, u.is_active, u.created_at, u.updated_at";

/// User record with its role name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub preferred_language: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: Uuid,
    pub preferred_language: Option<Language>,
}

/// Input for updating a user
#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub preferred_language: Option<Language>,
    pub is_active: Option<bool>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a user with an explicit role
    pub async fn create(&self, input: CreateUserInput) -> AppResult<UserRecord> {
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

        self.ensure_role_exists(input.role_id).await?;

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
        .bind(input.role_id)
        .bind(language.code())
        .fetch_one(&self.db)
        .await?;

        self.get(user_id).await
    }

    /// Get a user by id
    pub async fn get(&self, id: Uuid) -> AppResult<UserRecord> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// List users ordered by name
    pub async fn list(&self) -> AppResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id ORDER BY u.name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Update a user's profile, role or active flag
    pub async fn update(&self, id: Uuid, input: UpdateUserInput) -> AppResult<UserRecord> {
        let existing = self.get(id).await?;

        let email = match input.email {
            Some(email) => {
                validate_email(&email).map_err(|msg| AppError::Validation {
                    field: "email".to_string(),
                    message: msg.to_string(),
                    message_pt: "E-mail inválido".to_string(),
                })?;

                let email = email.trim().to_lowercase();
                if email != existing.email {
                    let taken = sqlx::query_scalar::<_, bool>(
                        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
                    )
                    .bind(&email)
                    .bind(id)
                    .fetch_one(&self.db)
                    .await?;

                    if taken {
                        return Err(AppError::DuplicateEntry("email".to_string()));
                    }
                }
                email
            }
            None => existing.email,
        };

        let role_id = input.role_id.unwrap_or(existing.role_id);
        if role_id != existing.role_id {
            self.ensure_role_exists(role_id).await?;
        }

        let name = input.name.unwrap_or(existing.name);
        let language = input
            .preferred_language
            .map(|l| l.code().to_string())
            .unwrap_or(existing.preferred_language);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, role_id = $4, preferred_language = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(&email)
        .bind(role_id)
        .bind(&language)
        .bind(is_active)
        .execute(&self.db)
        .await?;

        self.get(id).await
    }

    async fn ensure_role_exists(&self, role_id: Uuid) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
                .bind(role_id)
                .fetch_one(&self.db)
                .await?;

        if !exists {
            return Err(AppError::NotFound("Role".to_string()));
        }
        Ok(())
    }
}
