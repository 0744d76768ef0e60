use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Avatar, Role, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, avatar_public_id, avatar_url, role, \
                            reset_password_token, reset_password_expire, created_at";

impl User {
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        avatar: &Avatar,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, avatar_public_id, avatar_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(&avatar.public_id)
        .bind(&avatar.url)
        .fetch_one(db)
        .await
    }

    /// Lookup by the login key. The row includes the password hash; callers
    /// verify it and the serializer never emits it.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#,
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#,
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users ORDER BY created_at"#,
        ))
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
    }

    /// `None` when the record vanished between authentication and update.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET name = $2, email = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn update_role(
        db: &PgPool,
        id: Uuid,
        name: &str,
        email: &str,
        role: Role,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET name = $2, email = $3, role = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(db)
        .await
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Both halves of the reset pair are written in one statement.
    pub async fn store_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expire = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_password_token = NULL, reset_password_expire = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Match a stored, unexpired reset pair. Expiry is checked lazily here,
    /// not by a background sweep.
    pub async fn find_by_reset_token(
        db: &PgPool,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE reset_password_token = $1 AND reset_password_expire > $2
            "#,
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    /// Set the new password hash and clear the reset pair atomically.
    pub async fn complete_password_reset(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_password_token = NULL, reset_password_expire = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// `false` when no row matched the id.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
