use std::str::FromStr;

use log::info;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::config::DatabaseOptions;

pub mod crud;
pub mod query;
mod store;

pub use query::{Queries, QueryKind};
pub use store::*;

pub type Database = PgPool;

/// 初始化数据库连接池
///
/// 每个连接都会设置 `statement_timeout`，获取连接同样受 `query_timeout` 限制
pub async fn init_db(opts: &DatabaseOptions) -> Result<Database, sqlx::Error> {
    let timeout = opts.query_timeout();
    let options = PgConnectOptions::from_str(&opts.db_dsn)?
        .options([("statement_timeout", timeout.as_millis().to_string())]);

    info!(
        "初始化数据库连接: {}:{}/{}",
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or_default()
    );

    let pool = PgPoolOptions::new()
        .max_connections(opts.max_connections)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await?;

    Ok(pool)
}
