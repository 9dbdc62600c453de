use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement};
use std::str::FromStr;
use uuid::Uuid;

use super::models::{Account, Role};
use super::store::AccountStore;
use crate::error::{SessionError, SessionResult};

/// PostgreSQL implementation of AccountStore using SeaORM
#[derive(Clone)]
pub struct PostgresAccountStore {
    db: DatabaseConnection,
}

impl PostgresAccountStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    enabled: bool,
    locked: bool,
    verified: bool,
    deleted: bool,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let role = Role::from_str(&row.role).unwrap_or_else(|e| {
            tracing::warn!(account_id = %row.id, error = %e, "Falling back to USER role");
            Role::User
        });

        Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
            enabled: row.enabled,
            locked: row.locked,
            verified: row.verified,
            deleted: row.deleted,
        }
    }
}

const COLUMNS: &str = "id, email, password_hash, role, enabled, locked, verified, deleted";

// Lock state belongs to administrators; verification never clears it.
const MARK_VERIFIED_SQL: &str = r#"
            UPDATE accounts
            SET verified = TRUE, enabled = TRUE, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE AND verified = FALSE
        "#;

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_by_email(&self, email: &str) -> SessionResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = $1", COLUMNS);
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]);

        let row = AccountRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> SessionResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", COLUMNS);
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = AccountRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, account: Account) -> SessionResult<Account> {
        let sql = format!(
            r#"
            INSERT INTO accounts ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO NOTHING
            RETURNING {columns}
            "#,
            columns = COLUMNS
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                account.id.into(),
                account.email.into(),
                account.password_hash.into(),
                account.role.to_string().into(),
                account.enabled.into(),
                account.locked.into(),
                account.verified.into(),
                account.deleted.into(),
            ],
        );

        let row = AccountRow::find_by_statement(stmt).one(&self.db).await?;
        row.map(Into::into).ok_or(SessionError::AlreadyRegistered)
    }

    async fn mark_verified(&self, id: Uuid) -> SessionResult<bool> {
        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, MARK_VERIFIED_SQL, [id.into()]);

        let result = self.db.execute_raw(stmt).await?;
        Ok(result.rows_affected() > 0)
    }
}
