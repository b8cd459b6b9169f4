use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};

use super::{Database, Queries, QueryKind, crud};

/// 图片存储与向量检索能力
///
/// 向量的计算与排序都由数据库扩展完成，这里只描述网关需要的三个操作
pub trait ImageStore: Send + Sync + 'static {
    /// 查询图片在磁盘上的路径，不存在时返回 `None`
    fn image_location(&self, id: i64) -> impl Future<Output = Result<Option<String>>> + Send;

    /// 按与图片文件的距离升序返回最多 `limit` 个 ID
    fn rank_by_image(&self, path: &Path, limit: u32) -> impl Future<Output = Result<Vec<i64>>> + Send;

    /// 按与文本的距离升序返回最多 `limit` 个 ID
    fn rank_by_text(&self, text: &str, limit: u32) -> impl Future<Output = Result<Vec<i64>>> + Send;
}

/// 基于 PostgreSQL 向量扩展的实现
#[derive(Clone)]
pub struct PgImageStore {
    pool: Database,
    queries: Queries,
}

impl PgImageStore {
    pub fn new(pool: Database, queries: Queries) -> Self {
        Self { pool, queries }
    }
}

impl ImageStore for PgImageStore {
    async fn image_location(&self, id: i64) -> Result<Option<String>> {
        let location = crud::get_image_location(&self.pool, self.queries.location(), id).await?;
        Ok(location)
    }

    async fn rank_by_image(&self, path: &Path, limit: u32) -> Result<Vec<i64>> {
        let path = path.to_str().with_context(|| format!("路径不是合法的 UTF-8: {}", path.display()))?;
        let ids = crud::rank_images(&self.pool, self.queries.rank(QueryKind::Image), path, limit).await?;
        Ok(ids)
    }

    async fn rank_by_text(&self, text: &str, limit: u32) -> Result<Vec<i64>> {
        let ids = crud::rank_images(&self.pool, self.queries.rank(QueryKind::Text), text, limit).await?;
        Ok(ids)
    }
}
