//! Role management service for custom roles and permissions

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Role service for managing custom roles
#[derive(Clone)]
pub struct RoleService {
    db: PgPool,
}

/// Role information
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub description_pt: Option<String>,
    pub is_system_role: bool,
}

/// Permission information
#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

/// Input for creating a custom role
#[derive(Debug, Deserialize)]
pub struct CreateRoleInput {
    pub name: String,
    pub description: Option<String>,
    pub description_pt: Option<String>,
    pub permission_ids: Vec<Uuid>,
}

/// Input for updating a role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_pt: Option<String>,
    pub permission_ids: Option<Vec<Uuid>>,
}

/// Role with its permissions
#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl RoleService {
    /// Create a new RoleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get all roles
    pub async fn get_roles(&self) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description, description_pt, is_system_role
            FROM roles
            ORDER BY is_system_role DESC, name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// Get a role by ID with its permissions
    pub async fn get_role_with_permissions(&self, role_id: Uuid) -> AppResult<RoleWithPermissions> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, description_pt, is_system_role FROM roles WHERE id = $1",
        )
        .bind(role_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Role".to_string()))?;

        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.resource, p.action, p.description
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(RoleWithPermissions { role, permissions })
    }

    /// List all available permissions
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, resource, action, description FROM permissions ORDER BY resource, action",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Create a custom role with a permission set
    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleWithPermissions> {
        let name = input.name.trim().to_lowercase();
        if name.len() < 3 {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "role name must have at least 3 characters".to_string(),
                message_pt: "o nome do papel deve ter pelo menos 3 caracteres".to_string(),
            });
        }

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
                .bind(&name)
                .fetch_one(&self.db)
                .await?;

        if exists {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        self.ensure_permissions_exist(&input.permission_ids).await?;

        let mut tx = self.db.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description, description_pt)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, description_pt, is_system_role
            "#,
        )
        .bind(&name)
        .bind(&input.description)
        .bind(&input.description_pt)
        .fetch_one(&mut *tx)
        .await?;

        for permission_id in &input.permission_ids {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
                .bind(role.id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_role_with_permissions(role.id).await
    }

    /// Update a custom role. System roles are immutable.
    pub async fn update_role(
        &self,
        role_id: Uuid,
        input: UpdateRoleInput,
    ) -> AppResult<RoleWithPermissions> {
        let existing = self.get_role_with_permissions(role_id).await?;

        if existing.role.is_system_role {
            return Err(AppError::Conflict {
                resource: "role".to_string(),
                message: "system roles cannot be modified".to_string(),
                message_pt: "papéis do sistema não podem ser alterados".to_string(),
            });
        }

        let name = input
            .name
            .map(|n| n.trim().to_lowercase())
            .unwrap_or(existing.role.name);
        let description = input.description.or(existing.role.description);
        let description_pt = input.description_pt.or(existing.role.description_pt);

        if let Some(permission_ids) = &input.permission_ids {
            self.ensure_permissions_exist(permission_ids).await?;
        }

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE roles SET name = $2, description = $3, description_pt = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(role_id)
        .bind(&name)
        .bind(&description)
        .bind(&description_pt)
        .execute(&mut *tx)
        .await?;

        if let Some(permission_ids) = &input.permission_ids {
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(role_id)
                .execute(&mut *tx)
                .await?;

            for permission_id in permission_ids {
                sqlx::query(
                    "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)",
                )
                .bind(role_id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.get_role_with_permissions(role_id).await
    }

    /// Delete a custom role. Fails while users still hold it.
    pub async fn delete_role(&self, role_id: Uuid) -> AppResult<()> {
        let existing = self.get_role_with_permissions(role_id).await?;

        if existing.role.is_system_role {
            return Err(AppError::Conflict {
                resource: "role".to_string(),
                message: "system roles cannot be deleted".to_string(),
                message_pt: "papéis do sistema não podem ser excluídos".to_string(),
            });
        }

        let in_use =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE role_id = $1)")
                .bind(role_id)
                .fetch_one(&self.db)
                .await?;

        if in_use {
            return Err(AppError::Conflict {
                resource: "role".to_string(),
                message: "role is still assigned to users".to_string(),
                message_pt: "o papel ainda está atribuído a usuários".to_string(),
            });
        }

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn ensure_permissions_exist(&self, permission_ids: &[Uuid]) -> AppResult<()> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM permissions WHERE id = ANY($1)",
        )
        .bind(permission_ids)
        .fetch_one(&self.db)
        .await?;

        if count as usize != permission_ids.len() {
            return Err(AppError::Validation {
                field: "permission_ids".to_string(),
                message: "one or more permissions do not exist".to_string(),
                message_pt: "uma ou mais permissões não existem".to_string(),
            });
        }
        Ok(())
    }
}
