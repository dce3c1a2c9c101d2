/// User model and database operations
///
/// Users are provisioned the first time an external identity is verified
/// and afterwards only have their name and email synced. Deleting a user
/// cascades to every board they own.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     external_auth_id VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     CONSTRAINT users_email_key UNIQUE (email),
///     CONSTRAINT users_external_auth_id_key UNIQUE (external_auth_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Account owning boards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique across users
    pub email: String,

    /// Subject of the verified external identity, unique across users
    pub external_auth_id: String,

    /// When the user was provisioned
    pub created_at: DateTime<Utc>,

    /// When name or email last changed
    pub updated_at: DateTime<Utc>,
}

/// Claims of a verified external identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Stable subject identifier from the identity provider
    pub external_auth_id: String,

    /// Email address reported by the provider
    pub email: String,

    /// Display name, if the provider has one
    pub name: Option<String>,
}

impl ExternalIdentity {
    /// Name to store: the provided one, else the local part of the email
    pub fn display_name(&self) -> CoreResult<String> {
        let fallback = self.email.split('@').next().unwrap_or_default();
        crate::naming::normalize(self.name.as_deref())
            .or_else(|| crate::naming::normalize(Some(fallback)))
            .ok_or_else(|| CoreError::validation("name", "identity has neither name nor email"))
    }

    /// Checks the identity before a user is created or synced
    pub fn validate(&self) -> CoreResult<()> {
        if self.external_auth_id.trim().is_empty() {
            return Err(CoreError::validation("external_auth_id", "must not be blank"));
        }
        if self.email.trim().is_empty() {
            return Err(CoreError::validation("email", "must not be blank"));
        }
        Ok(())
    }

    /// Builds a brand new user row
    pub fn into_user(self, now: DateTime<Utc>) -> CoreResult<User> {
        self.validate()?;
        let name = self.display_name()?;
        Ok(User {
            id: Uuid::new_v4(),
            name,
            email: self.email.trim().to_string(),
            external_auth_id: self.external_auth_id,
            created_at: now,
            updated_at: now,
        })
    }
}

impl User {
    /// Copies name and email from a fresh verification
    ///
    /// Returns true if anything changed.
    pub fn sync_from(&mut self, identity: &ExternalIdentity, now: DateTime<Utc>) -> CoreResult<bool> {
        identity.validate()?;
        let name = identity.display_name()?;
        let email = identity.email.trim().to_string();
        if self.name == name && self.email == email {
            return Ok(false);
        }

        self.name = name;
        self.email = email;
        self.updated_at = now;
        Ok(true)
    }

    /// Inserts a new user row
    pub async fn insert<'e, E>(executor: E, user: &User) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, external_auth_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, external_auth_id, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.external_auth_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> CoreResult<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, external_auth_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds and row-locks a user by ID
    pub async fn find_by_id_for_update<'e, E>(executor: E, id: Uuid) -> CoreResult<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, external_auth_id, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds and row-locks a user by external identity
    pub async fn find_by_external_auth_id_for_update<'e, E>(
        executor: E,
        external_auth_id: &str,
    ) -> CoreResult<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, external_auth_id, created_at, updated_at
            FROM users
            WHERE external_auth_id = $1
            FOR UPDATE
            "#,
        )
        .bind(external_auth_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Writes synced name and email back
    pub async fn save<'e, E>(executor: E, user: &User) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, email = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, name, email, external_auth_id, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.updated_at)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CoreError::not_found("user", user.id))?;

        Ok(user)
    }

    /// Deletes a user and, via cascade, their boards
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> CoreResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
