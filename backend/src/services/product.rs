//! Product catalog service
//!
//! Owns product storage. Stock itself is only ever written by the
//! movement service; this service manages the descriptive fields, the
//! minimum-stock threshold and the active flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

const PRODUCT_COLUMNS: &str = "id, code, name, description, unit, stock, min_stock, supplier_id, \
                               last_entry_at, is_active, created_at, updated_at";

/// Product record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub stock: i32,
    pub min_stock: i32,
    pub supplier_id: Option<Uuid>,
    pub last_entry_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// Opening stock; later changes go through movements
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub supplier_id: Option<Uuid>,
}

/// Input for updating a product. Stock is deliberately absent: quantities
/// change only through registered movements.
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub min_stock: Option<i32>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        let code = input.code.trim().to_uppercase();
        if code.len() < 2 {
            return Err(AppError::Validation {
                field: "code".to_string(),
                message: "product code must have at least 2 characters".to_string(),
                message_pt: "o código do produto deve ter pelo menos 2 caracteres".to_string(),
            });
        }

        let opening_stock = input.stock.unwrap_or(0);
        let min_stock = input.min_stock.unwrap_or(0);
        if opening_stock < 0 || min_stock < 0 {
            return Err(AppError::Validation {
                field: "stock".to_string(),
                message: "stock and min_stock cannot be negative".to_string(),
                message_pt: "estoque e estoque mínimo não podem ser negativos".to_string(),
            });
        }

        // Check for duplicate code
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE code = $1)",
        )
        .bind(&code)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        if let Some(supplier_id) = input.supplier_id {
            self.ensure_supplier_exists(supplier_id).await?;
        }

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (code, name, description, unit, stock, min_stock, supplier_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.unit)
        .bind(opening_stock)
        .bind(min_stock)
        .bind(input.supplier_id)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// Get a product by id
    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Get a product by its code
    pub async fn get_by_code(&self, code: &str) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = $1"
        ))
        .bind(code.trim().to_uppercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// List products ordered by code
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active OR $1 ORDER BY code"
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Update a product's descriptive fields
    pub async fn update(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let existing = self.get(id).await?;

        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let unit = input.unit.or(existing.unit);
        let min_stock = input.min_stock.unwrap_or(existing.min_stock);
        let supplier_id = input.supplier_id.or(existing.supplier_id);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        if min_stock < 0 {
            return Err(AppError::Validation {
                field: "min_stock".to_string(),
                message: "min_stock cannot be negative".to_string(),
                message_pt: "o estoque mínimo não pode ser negativo".to_string(),
            });
        }

        if let Some(supplier_id) = supplier_id {
            self.ensure_supplier_exists(supplier_id).await?;
        }

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, unit = $4, min_stock = $5,
                supplier_id = $6, is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name.trim())
        .bind(&description)
        .bind(&unit)
        .bind(min_stock)
        .bind(supplier_id)
        .bind(is_active)
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// List active products at or below their minimum stock
    pub async fn low_stock(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active AND stock <= min_stock ORDER BY code"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    async fn ensure_supplier_exists(&self, supplier_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }
}
