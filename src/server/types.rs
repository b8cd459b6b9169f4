use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 以图搜图请求参数
#[derive(TryFromMultipart)]
pub struct SearchImageRequest {
    pub file: Option<FieldData<Bytes>>,
    /// 旧版前端使用的字段名
    pub image: Option<FieldData<Bytes>>,
}

/// 以图搜图表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchImageForm {
    /// 上传的图片文件，也可以使用字段名 `image`
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// 以文搜图的 multipart 请求参数
#[derive(TryFromMultipart)]
pub struct SearchTextMultipart {
    pub query: Option<String>,
}

/// 以文搜图表单
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchTextForm {
    /// 搜索文本，首尾空白会被去除
    #[serde(default)]
    pub query: String,
}

/// 搜索响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// 按相似度从高到低排列的图片 ID
    pub ids: Vec<i64>,
}
