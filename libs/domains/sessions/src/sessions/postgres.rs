use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement};
use uuid::Uuid;

use super::models::{NewRefreshToken, RefreshTokenRecord};
use super::repository::SessionRepository;
use crate::error::{SessionError, SessionResult};

/// PostgreSQL implementation of SessionRepository using SeaORM
#[derive(Clone)]
pub struct PostgresSessionRepository {
    db: DatabaseConnection,
}

impl PostgresSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct RefreshTokenRow {
    id: i64,
    token_hash: String,
    user_id: Uuid,
    session_id: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: row.id,
            token_hash: row.token_hash,
            user_id: row.user_id,
            session_id: row.session_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
        }
    }
}

const COLUMNS: &str = "id, token_hash, user_id, session_id, issued_at, expires_at, revoked";

impl PostgresSessionRepository {
    async fn execute(&self, stmt: Statement) -> SessionResult<u64> {
        let result = self.db.execute_raw(stmt).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, record: NewRefreshToken) -> SessionResult<RefreshTokenRecord> {
        let sql = format!(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, session_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {}
            "#,
            COLUMNS
        );

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                record.token_hash.into(),
                record.user_id.into(),
                record.session_id.into(),
                record.issued_at.into(),
                record.expires_at.into(),
            ],
        );

        let row = RefreshTokenRow::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| SessionError::Database("insert returned no row".to_string()))?;

        Ok(row.into())
    }

    async fn find_active_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<Option<RefreshTokenRecord>> {
        let sql = format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = $1 AND revoked = FALSE AND expires_at > $2",
            COLUMNS
        );

        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, sql, [token_hash.into(), now.into()]);

        let row = RefreshTokenRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn revoke_if_active(&self, id: i64, now: DateTime<Utc>) -> SessionResult<bool> {
        let sql = r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE AND expires_at > $2
        "#;

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into(), now.into()]);
        Ok(self.execute(stmt).await? == 1)
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> SessionResult<Vec<RefreshTokenRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM refresh_tokens
            WHERE user_id = $1 AND revoked = FALSE AND expires_at > $2
            ORDER BY issued_at DESC, id DESC
            "#,
            COLUMNS
        );

        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, sql, [user_id.into(), now.into()]);

        let rows = RefreshTokenRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> SessionResult<u64> {
        let sql = r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND revoked = FALSE AND expires_at > $2
        "#;

        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, sql, [user_id.into(), now.into()]);
        self.execute(stmt).await
    }

    async fn revoke_all_for_user_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<u64> {
        let sql = r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND session_id = $2 AND revoked = FALSE AND expires_at > $3
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [user_id.into(), session_id.into(), now.into()],
        );
        self.execute(stmt).await
    }

    async fn purge(&self, as_of: DateTime<Utc>) -> SessionResult<u64> {
        let sql = r#"
            DELETE FROM refresh_tokens
            WHERE (expires_at < $1 OR revoked = TRUE) AND issued_at <= $1
        "#;

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [as_of.into()]);
        self.execute(stmt).await
    }
}
