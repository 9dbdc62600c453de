use sea_orm::{ConnectionTrait, DatabaseConnection};

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Creates the `accounts` and `refresh_tokens` tables if they are missing.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    db.execute_unprepared(INIT_SQL).await?;
    tracing::info!("Session schema ready");
    Ok(())
}
