mod notification_outbox_mysql;
mod refresh_token_store_mysql;

pub use notification_outbox_mysql::*;
pub use refresh_token_store_mysql::*;

mod util;

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &sqlx::MySqlPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
