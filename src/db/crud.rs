use sqlx::{Executor, Postgres, Result};

/// 查询图片路径，ID 不存在或路径为空时返回 `None`
pub async fn get_image_location<'c, E>(executor: E, sql: &str, id: i64) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    let location = sqlx::query_scalar::<Postgres, Option<String>>(sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(location.flatten())
}

/// 执行排序查询，按数据库返回的顺序收集所有 ID
pub async fn rank_images<'c, E>(executor: E, sql: &str, input: &str, limit: u32) -> Result<Vec<i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar::<Postgres, i64>(sql)
        .bind(input)
        .bind(i64::from(limit))
        .fetch_all(executor)
        .await
}
