use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::db::ImageStore;

/// 网关运行参数
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 上传文件暂存目录，需要是绝对路径
    pub upload_dir: PathBuf,
    /// 以图搜图请求体的最大大小
    pub max_upload_size: usize,
    /// 返回的结果数量
    pub result_limit: u32,
    /// 单次查询的超时时间
    pub query_timeout: Duration,
}

/// 应用状态
pub struct AppState<S> {
    /// 图片存储
    pub store: S,
    /// 运行参数
    pub config: GatewayConfig,
}

impl<S: ImageStore> AppState<S> {
    /// 创建新的应用状态
    pub fn new(store: S, config: GatewayConfig) -> Arc<Self> {
        Arc::new(AppState { store, config })
    }
}
