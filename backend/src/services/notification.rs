//! Notification service for low-stock alerts and in-app notifications
//!
//! Notifications are queued in the database first and delivered by email
//! best-effort; a failed delivery leaves the row queued as failed without
//! affecting the operation that triggered it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::MailerClient;
use shared::types::Language;

/// Notification service managing the queue and email delivery
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    mailer: Option<MailerClient>,
}

/// Notification type enum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LowStock,
    System,
}

/// Notification status enum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Read,
}

/// Queued notification
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub title_pt: Option<String>,
    pub message: String,
    pub message_pt: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Recipient row for alert fan-out
#[derive(Debug, FromRow)]
struct RecipientRow {
    id: Uuid,
    email: String,
    preferred_language: String,
}

/// Pending queue row joined with its recipient
#[derive(Debug, FromRow)]
struct PendingRow {
    id: Uuid,
    email: String,
    preferred_language: String,
    title: String,
    title_pt: Option<String>,
    message: String,
    message_pt: Option<String>,
}

/// Result of a queue processing run
#[derive(Debug, Serialize)]
pub struct ProcessQueueResult {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            mailer: MailerClient::from_config(&config.mail),
            db,
        }
    }

    /// Queue a low-stock alert for every user entitled to receive them,
    /// attempting immediate email delivery.
    pub async fn notify_low_stock(
        &self,
        product_id: Uuid,
        code: &str,
        name: &str,
        stock: i32,
        min_stock: i32,
    ) -> AppResult<()> {
        let recipients = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT DISTINCT u.id, u.email, u.preferred_language
            FROM users u
            JOIN role_permissions rp ON rp.role_id = u.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE p.resource = 'notifications' AND p.action = 'low_stock'
              AND u.is_active = TRUE
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let title = "Low stock alert".to_string();
        let title_pt = "Alerta de estoque baixo".to_string();
        let message = format!(
            "Product {} ({}) is down to {} units (minimum {})",
            name, code, stock, min_stock
        );
        let message_pt = format!(
            "O produto {} ({}) está com {} unidades em estoque (mínimo {})",
            name, code, stock, min_stock
        );

        for recipient in recipients {
            let queued = sqlx::query_as::<_, QueuedNotification>(
                r#"
                INSERT INTO notification_queue
                    (user_id, notification_type, title, title_pt, message, message_pt, entity_type, entity_id)
                VALUES ($1, 'low_stock', $2, $3, $4, $5, 'product', $6)
                RETURNING id, user_id, notification_type, title, title_pt, message, message_pt,
                          entity_type, entity_id, status, created_at, sent_at
                "#,
            )
            .bind(recipient.id)
            .bind(&title)
            .bind(&title_pt)
            .bind(&message)
            .bind(&message_pt)
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;

            self.deliver(&queued, &recipient.email, &recipient.preferred_language)
                .await;
        }

        Ok(())
    }

    /// Attempt email delivery for one queued notification and record the outcome
    async fn deliver(&self, queued: &QueuedNotification, email: &str, preferred_language: &str) {
        let notification_id = queued.id;
        let Some(mailer) = &self.mailer else {
            return; // not configured: leave the row pending for a later run
        };

        let language = Language::from_code(preferred_language).unwrap_or_default();
        let (subject, body) = match language {
            Language::Portuguese => (
                queued.title_pt.as_deref().unwrap_or(&queued.title),
                queued.message_pt.as_deref().unwrap_or(&queued.message),
            ),
            Language::English => (queued.title.as_str(), queued.message.as_str()),
        };

        let status = match mailer.send(email, subject, body).await {
            Ok(()) => NotificationStatus::Sent,
            Err(err) => {
                tracing::warn!(notification = %notification_id, error = %err, "email delivery failed");
                NotificationStatus::Failed
            }
        };

        let result = sqlx::query(
            "UPDATE notification_queue SET status = $2, sent_at = CASE WHEN $2 = 'sent'::notification_status THEN NOW() ELSE sent_at END WHERE id = $1",
        )
        .bind(notification_id)
        .bind(&status)
        .execute(&self.db)
        .await;

        if let Err(err) = result {
            tracing::warn!(notification = %notification_id, error = %err, "failed to record delivery status");
        }
    }

    /// Retry delivery of every pending or failed notification
    pub async fn process_queue(&self) -> AppResult<ProcessQueueResult> {
        let pending = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT n.id, u.email, u.preferred_language,
                   n.title, n.title_pt, n.message, n.message_pt
            FROM notification_queue n
            JOIN users u ON u.id = n.user_id
            WHERE n.status IN ('pending', 'failed')
            ORDER BY n.created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let Some(mailer) = &self.mailer else {
            return Err(AppError::ExternalService(
                "email service is not configured".to_string(),
            ));
        };

        let mut sent = 0;
        let mut failed = 0;

        for row in &pending {
            let language = Language::from_code(&row.preferred_language).unwrap_or_default();
            let (subject, body) = match language {
                Language::Portuguese => (
                    row.title_pt.as_deref().unwrap_or(&row.title),
                    row.message_pt.as_deref().unwrap_or(&row.message),
                ),
                Language::English => (row.title.as_str(), row.message.as_str()),
            };

            let status = match mailer.send(&row.email, subject, body).await {
                Ok(()) => {
                    sent += 1;
                    NotificationStatus::Sent
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!(notification = %row.id, error = %err, "email delivery failed");
                    NotificationStatus::Failed
                }
            };

            sqlx::query(
                "UPDATE notification_queue SET status = $2, sent_at = CASE WHEN $2 = 'sent'::notification_status THEN NOW() ELSE sent_at END WHERE id = $1",
            )
            .bind(row.id)
            .bind(&status)
            .execute(&self.db)
            .await?;
        }

        Ok(ProcessQueueResult {
            processed: pending.len(),
            sent,
            failed,
        })
    }

    /// List notifications for a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<QueuedNotification>> {
        let notifications = sqlx::query_as::<_, QueuedNotification>(
            r#"
            SELECT id, user_id, notification_type, title, title_pt, message, message_pt,
                   entity_type, entity_id, status, created_at, sent_at
            FROM notification_queue
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE notification_queue SET status = 'read' WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }

        Ok(())
    }
}
