//! Supplier registry service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::validation::{validate_cnpj, validate_email};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

const SUPPLIER_COLUMNS: &str =
    "id, name, legal_name, cnpj, email, phone, is_active, created_at, updated_at";

/// Supplier record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub legal_name: Option<String>,
    pub cnpj: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub legal_name: Option<String>,
    pub cnpj: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub legal_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier
    pub async fn create(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        validate_cnpj(&input.cnpj).map_err(|msg| AppError::Validation {
            field: "cnpj".to_string(),
            message: msg.to_string(),
            message_pt: "CNPJ inválido".to_string(),
        })?;

        if let Some(email) = &input.email {
            validate_email(email).map_err(|msg| AppError::Validation {
                field: "email".to_string(),
                message: msg.to_string(),
                message_pt: "E-mail inválido".to_string(),
            })?;
        }

        // Store only the digits so uniqueness ignores punctuation
        let cnpj: String = input.cnpj.chars().filter(|c| c.is_ascii_digit()).collect();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE cnpj = $1)",
        )
        .bind(&cnpj)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("cnpj".to_string()));
        }

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (name, legal_name, cnpj, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SUPPLIER_COLUMNS}
            "#,
        ))
        .bind(input.name.trim())
        .bind(&input.legal_name)
        .bind(&cnpj)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    /// Get a supplier by id
    pub async fn get(&self, id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// List suppliers ordered by name
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE is_active OR $1 ORDER BY name"
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(suppliers)
    }

    /// Update a supplier. The CNPJ is immutable once registered.
    pub async fn update(&self, id: Uuid, input: UpdateSupplierInput) -> AppResult<Supplier> {
        let existing = self.get(id).await?;

        if let Some(email) = &input.email {
            validate_email(email).map_err(|msg| AppError::Validation {
                field: "email".to_string(),
                message: msg.to_string(),
                message_pt: "E-mail inválido".to_string(),
            })?;
        }

        let name = input.name.unwrap_or(existing.name);
        let legal_name = input.legal_name.or(existing.legal_name);
        let email = input.email.or(existing.email);
        let phone = input.phone.or(existing.phone);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $2, legal_name = $3, email = $4, phone = $5, is_active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name.trim())
        .bind(&legal_name)
        .bind(&email)
        .bind(&phone)
        .bind(is_active)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }
}
