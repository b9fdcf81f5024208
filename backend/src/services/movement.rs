//! Stock movement service: registration and lifecycle reconciliation
//!
//! This service is the only writer of product stock. Every lifecycle
//! transition of a movement (register, edit, deactivate, reactivate,
//! delete) is translated into per-line stock deltas and applied inside a
//! single database transaction, with each product row locked via
//! `SELECT ... FOR UPDATE`. Concurrent movements against the same product
//! therefore serialize, and a failure on any line rolls back every line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    application_deltas, delete_allowed, economic_edit_allowed, reversal_deltas, InvoiceInfo,
    LineItem, MovementType, StockDelta, StockEffect, DELETE_WINDOW_DAYS, EDIT_WINDOW_HOURS,
};
use crate::services::NotificationService;
use shared::validation::{validate_destination, validate_line_items, validate_nfe_access_key};

/// Movement service coordinating stock reconciliation
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
    notifications: NotificationService,
}

const MOVEMENT_COLUMNS: &str = "id, movement_type, destination, occurred_at, user_id, active, \
                                line_items, invoice, created_at, updated_at";

/// A stock movement record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Movement {
    pub id: Uuid,
    pub movement_type: String,
    pub destination: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub active: bool,
    pub line_items: Json<Vec<LineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Json<InvoiceInfo>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movement {
    /// Stored movement type. Rows are only ever written through validated
    /// inputs, so an unparseable column means the record was corrupted.
    pub fn movement_type(&self) -> AppResult<MovementType> {
        MovementType::parse(&self.movement_type).ok_or_else(|| {
            AppError::Internal(format!(
                "movement {} has invalid type {:?}",
                self.id, self.movement_type
            ))
        })
    }
}

/// Input for registering a movement
#[derive(Debug, Deserialize)]
pub struct RegisterMovementInput {
    pub movement_type: MovementType,
    pub destination: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub line_items: Vec<LineItem>,
    pub invoice: Option<InvoiceInfo>,
}

/// Fields of an edit that are persisted to the movement record.
///
/// Edits are intentionally narrow: whatever else the caller submits, only
/// the destination (and the refreshed `updated_at`) is written back.
#[derive(Debug, Default, Deserialize)]
pub struct MovementPatch {
    pub destination: Option<String>,
}

/// Fields of an edit that drive stock reconciliation without being
/// persisted: the stored record keeps its original line items and type,
/// but stock is reconciled as if the movement now carried these.
#[derive(Debug, Deserialize)]
pub struct ReconciliationInput {
    pub movement_type: Option<MovementType>,
    pub line_items: Option<Vec<LineItem>>,
}

/// Product fields read under row lock during reconciliation
#[derive(Debug, FromRow)]
struct ProductStockRow {
    id: Uuid,
    code: String,
    name: String,
    stock: i32,
    min_stock: i32,
}

/// Product state after a delta was applied, used for low-stock alerts
#[derive(Debug, Clone)]
struct AppliedStock {
    product_id: Uuid,
    code: String,
    name: String,
    stock: i32,
    min_stock: i32,
    decreased: bool,
}

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            notifications: NotificationService::new(db.clone(), config),
            db,
        }
    }

    /// Register a movement, applying its stock effect line by line
    pub async fn register(
        &self,
        user_id: Uuid,
        input: RegisterMovementInput,
    ) -> AppResult<Movement> {
        validate_destination(&input.destination).map_err(destination_error)?;
        validate_line_items(input.movement_type, &input.line_items)?;
        if let Some(invoice) = &input.invoice {
            validate_nfe_access_key(&invoice.access_key).map_err(|msg| AppError::Validation {
                field: "invoice.access_key".to_string(),
                message: msg.to_string(),
                message_pt: "a chave de acesso da NF-e deve ter 44 dígitos numéricos".to_string(),
            })?;
        }

        let occurred_at = input.occurred_at.unwrap_or_else(Utc::now);

        let mut tx = self.db.begin().await?;

        let deltas = application_deltas(input.movement_type, &input.line_items);
        let applied = self.apply_deltas(&mut tx, &deltas, true).await?;

        let movement = sqlx::query_as::<_, Movement>(&format!(
            r#"
            INSERT INTO movements (movement_type, destination, occurred_at, user_id, line_items, invoice)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MOVEMENT_COLUMNS}
            "#,
        ))
        .bind(input.movement_type.as_str())
        .bind(input.destination.trim())
        .bind(occurred_at)
        .bind(user_id)
        .bind(Json(&input.line_items))
        .bind(input.invoice.as_ref().map(Json))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.alert_low_stock(&applied);

        Ok(movement)
    }

    /// Get a movement by id
    pub async fn get(&self, id: Uuid) -> AppResult<Movement> {
        sqlx::query_as::<_, Movement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))
    }

    /// List movements, most recent first
    pub async fn list(&self) -> AppResult<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements ORDER BY occurred_at DESC, created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Edit a movement.
    ///
    /// When a reconciliation payload is present the stored stock effect is
    /// reversed and the new effect applied, gated by the 24-hour window.
    /// Regardless of what was submitted, only the destination is persisted.
    pub async fn update(
        &self,
        id: Uuid,
        patch: MovementPatch,
        reconcile: Option<ReconciliationInput>,
    ) -> AppResult<Movement> {
        let existing = self.get(id).await?;
        let now = Utc::now();

        if let Some(destination) = &patch.destination {
            validate_destination(destination).map_err(destination_error)?;
        }

        let Some(reconcile) = reconcile else {
            // Descriptive edit: allowed at any time, no stock effect
            return self.persist_patch(&self.db, id, patch.destination.as_deref()).await;
        };

        if !economic_edit_allowed(existing.occurred_at, now) {
            return Err(AppError::Forbidden {
                message: format!(
                    "line items and type can only be edited within {} hours of the movement",
                    EDIT_WINDOW_HOURS
                ),
                message_pt: format!(
                    "itens e tipo só podem ser editados em até {} horas após o movimento",
                    EDIT_WINDOW_HOURS
                ),
            });
        }

        let current_type = existing.movement_type()?;
        let new_type = reconcile.movement_type.unwrap_or(current_type);
        let client_supplied_items = reconcile.line_items.is_some();
        let new_items = reconcile
            .line_items
            .unwrap_or_else(|| existing.line_items.0.clone());
        validate_line_items(new_type, &new_items)?;

        let mut tx = self.db.begin().await?;

        // Reconciliation only makes sense while the stored effect is in
        // force; a deactivated movement has nothing to reverse.
        let applied = if existing.active {
            let reversal = reversal_deltas(current_type, &existing.line_items.0);
            self.apply_deltas(&mut tx, &reversal, false).await?;

            let application = application_deltas(new_type, &new_items);
            self.apply_deltas(&mut tx, &application, client_supplied_items)
                .await?
        } else {
            Vec::new()
        };

        let movement = self
            .persist_patch(&mut *tx, id, patch.destination.as_deref())
            .await?;

        tx.commit().await?;

        self.alert_low_stock(&applied);

        Ok(movement)
    }

    /// Take a movement's stock effect out of force
    pub async fn deactivate(&self, id: Uuid) -> AppResult<Movement> {
        let existing = self.get(id).await?;
        if !existing.active {
            return Err(AppError::Conflict {
                resource: "movement".to_string(),
                message: "movement is already deactivated".to_string(),
                message_pt: "o movimento já está desativado".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let reversal = reversal_deltas(existing.movement_type()?, &existing.line_items.0);
        self.apply_deltas(&mut tx, &reversal, false).await?;

        let movement = sqlx::query_as::<_, Movement>(&format!(
            "UPDATE movements SET active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(movement)
    }

    /// Put a previously deactivated movement's stock effect back in force
    pub async fn reactivate(&self, id: Uuid) -> AppResult<Movement> {
        let existing = self.get(id).await?;
        if existing.active {
            return Err(AppError::Conflict {
                resource: "movement".to_string(),
                message: "movement is already active".to_string(),
                message_pt: "o movimento já está ativo".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let application = application_deltas(existing.movement_type()?, &existing.line_items.0);
        let applied = self
            .apply_deltas(&mut tx, &application, false)
            .await
            .map_err(|err| match err {
                // Reapplying an exit against stock that has since been
                // consumed is a state conflict, not a request error
                AppError::InsufficientStock {
                    product,
                    available,
                    requested,
                } => AppError::Conflict {
                    resource: product.clone(),
                    message: format!(
                        "cannot reactivate: product {} has {} in stock, movement needs {}",
                        product, available, requested
                    ),
                    message_pt: format!(
                        "não é possível reativar: o produto {} tem {} em estoque e o movimento precisa de {}",
                        product, available, requested
                    ),
                },
                other => other,
            })?;

        let movement = sqlx::query_as::<_, Movement>(&format!(
            "UPDATE movements SET active = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.alert_low_stock(&applied);

        Ok(movement)
    }

    /// Permanently remove a movement, reversing any effect still in force.
    /// Allowed only within the delete window.
    pub async fn delete(&self, id: Uuid) -> AppResult<Movement> {
        let existing = self.get(id).await?;

        if !delete_allowed(existing.occurred_at, Utc::now()) {
            return Err(AppError::Forbidden {
                message: format!(
                    "movements can only be deleted within {} days of occurrence",
                    DELETE_WINDOW_DAYS
                ),
                message_pt: format!(
                    "movimentos só podem ser excluídos em até {} dias após a ocorrência",
                    DELETE_WINDOW_DAYS
                ),
            });
        }

        let mut tx = self.db.begin().await?;

        if existing.active {
            let reversal = reversal_deltas(existing.movement_type()?, &existing.line_items.0);
            self.apply_deltas(&mut tx, &reversal, false).await?;
        }

        sqlx::query("DELETE FROM movements WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(existing)
    }

    /// Apply planned deltas in line order inside the caller's transaction.
    ///
    /// Each product row is locked before being read, so a line sees the
    /// stock left by earlier lines of the same movement, and concurrent
    /// requests against the same product wait their turn. `verify_codes`
    /// cross-checks client-supplied product codes; reversals of stored
    /// lines skip it since codes may have been renamed since registration.
    async fn apply_deltas(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        deltas: &[StockDelta],
        verify_codes: bool,
    ) -> AppResult<Vec<AppliedStock>> {
        let mut applied = Vec::with_capacity(deltas.len());

        for (index, delta) in deltas.iter().enumerate() {
            let product = sqlx::query_as::<_, ProductStockRow>(
                "SELECT id, code, name, stock, min_stock FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(delta.product_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", delta.product_id)))?;

            if verify_codes {
                if let Some(code) = &delta.product_code {
                    if code != &product.code {
                        return Err(AppError::Validation {
                            field: format!("line_items[{}].product_code", index),
                            message: format!(
                                "product code mismatch: expected {}, got {}",
                                product.code, code
                            ),
                            message_pt: format!(
                                "código do produto divergente: esperado {}, recebido {}",
                                product.code, code
                            ),
                        });
                    }
                }
            }

            let (new_stock, touch_last_entry) = match delta.effect {
                StockEffect::Increase { touch_last_entry } => {
                    (product.stock + delta.quantity, touch_last_entry)
                }
                StockEffect::Decrease => {
                    if product.stock < delta.quantity {
                        return Err(AppError::InsufficientStock {
                            product: product.code.clone(),
                            available: product.stock,
                            requested: delta.quantity,
                        });
                    }
                    (product.stock - delta.quantity, false)
                }
                StockEffect::DecreaseClamped => {
                    if product.stock < delta.quantity {
                        // The ledger and the product stock have already
                        // diverged; surface it for auditing
                        tracing::warn!(
                            product = %product.code,
                            stock = product.stock,
                            reversed = delta.quantity,
                            "entry reversal clamped at zero"
                        );
                    }
                    ((product.stock - delta.quantity).max(0), false)
                }
            };

            let update_sql = if touch_last_entry {
                "UPDATE products SET stock = $2, last_entry_at = NOW(), updated_at = NOW() WHERE id = $1"
            } else {
                "UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1"
            };

            sqlx::query(update_sql)
                .bind(product.id)
                .bind(new_stock)
                .execute(&mut **tx)
                .await?;

            applied.push(AppliedStock {
                product_id: product.id,
                code: product.code,
                name: product.name,
                stock: new_stock,
                min_stock: product.min_stock,
                decreased: delta.signed_quantity() < 0,
            });
        }

        Ok(applied)
    }

    /// Write the narrow edit patch: destination (when supplied) and a
    /// refreshed `updated_at`.
    async fn persist_patch<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        destination: Option<&str>,
    ) -> AppResult<Movement>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Movement>(&format!(
            "UPDATE movements SET destination = COALESCE($2, destination), updated_at = NOW() \
             WHERE id = $1 RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(destination.map(str::trim))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))
    }

    /// Queue low-stock alerts for products a decrease left at or below
    /// their minimum. Delivery is fire-and-forget.
    fn alert_low_stock(&self, applied: &[AppliedStock]) {
        for entry in applied {
            if entry.decreased && entry.stock <= entry.min_stock {
                let notifications = self.notifications.clone();
                let entry = entry.clone();
                tokio::spawn(async move {
                    if let Err(err) = notifications
                        .notify_low_stock(
                            entry.product_id,
                            &entry.code,
                            &entry.name,
                            entry.stock,
                            entry.min_stock,
                        )
                        .await
                    {
                        tracing::warn!(
                            product = %entry.code,
                            error = %err,
                            "failed to queue low-stock notification"
                        );
                    }
                });
            }
        }
    }
}

fn destination_error(msg: &'static str) -> AppError {
    AppError::Validation {
        field: "destination".to_string(),
        message: msg.to_string(),
        message_pt: "o destino deve ter pelo menos 3 caracteres".to_string(),
    }
}
