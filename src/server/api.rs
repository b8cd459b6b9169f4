use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use axum::body::Body;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use axum::{Form, Json};
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};
use log::{info, warn};
use tokio::time::timeout;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::db::{ImageStore, QueryKind};
use crate::{metrics, staging};

/// 图片固定以 JPEG 返回，不做内容探测
const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// 根据 ID 获取图片
#[utoipa::path(
    get,
    path = "/image/{id}",
    params(("id" = i64, Path, description = "图片 ID")),
    responses(
        (status = 200, content_type = "image/jpeg", body = Vec<u8>),
        (status = 400, description = "ID 不是数字"),
        (status = 404, description = "ID 不存在"),
    )
)]
pub async fn image_handler<S: ImageStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response> {
    let id = parse_id(&id).ok_or(AppError::BadRequest("Error parsing id"))?;

    let location = with_deadline(state.config.query_timeout, state.store.image_location(id))
        .await
        .context("Error querying index")?
        .ok_or(AppError::NotFound("Error no such ID"))?;

    let response = ServeFile::new(&location).oneshot(request).await?;
    if response.status() == StatusCode::NOT_FOUND {
        warn!("图片 {id} 的文件不存在: {location}");
        return Err(AppError::NotFound("Error no such ID"));
    }

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(IMAGE_CONTENT_TYPE));
    }
    Ok(response)
}

/// 以图搜图
#[utoipa::path(
    post,
    path = "/search/image/",
    request_body(content = SearchImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "表单解析失败或缺少文件"),
    )
)]
pub async fn search_image_handler<S: ImageStore>(
    State(state): State<Arc<AppState<S>>>,
    form: std::result::Result<TypedMultipart<SearchImageRequest>, TypedMultipartError>,
) -> Result<Json<SearchResponse>> {
    let TypedMultipart(form) = form.map_err(|e| {
        warn!("解析表单失败: {e}");
        AppError::BadRequest("Error parsing form")
    })?;
    let file = form.file.or(form.image).ok_or(AppError::BadRequest("Error reading file"))?;
    let file_name = file.metadata.file_name;

    info!("正在搜索上传图片: {:?} ({} 字节)", file_name, file.contents.len());

    let staged = staging::stage(&state.config.upload_dir, file_name.as_deref(), file.contents).await?;
    let limit = state.config.result_limit;
    let ids = observe(
        QueryKind::Image,
        with_deadline(state.config.query_timeout, state.store.rank_by_image(staged.path(), limit)),
    )
    .await
    .context("Error querying index")?;
    staged.remove().context("Error removing temp file")?;

    Ok(render(ids, limit))
}

/// 以文搜图
#[utoipa::path(
    post,
    path = "/search/text/",
    request_body(content = SearchTextForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "搜索文本为空"),
    )
)]
pub async fn search_text_handler<S: ImageStore>(
    State(state): State<Arc<AppState<S>>>,
    TextQuery(query): TextQuery,
) -> Result<Json<SearchResponse>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Query cannot be empty"));
    }

    info!("正在搜索文本: {query}");

    let limit = state.config.result_limit;
    let ids = observe(
        QueryKind::Text,
        with_deadline(state.config.query_timeout, state.store.rank_by_text(query, limit)),
    )
    .await
    .context("Error querying index")?;

    Ok(render(ids, limit))
}

/// 路由存在但请求方法不匹配
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// 表单中的 `query` 字段，同时支持 urlencoded 与 multipart
///
/// 请求体中没有有效的 `query` 时，回退到 URL 查询参数
pub struct TextQuery(pub String);

impl<S: Send + Sync> FromRequest<S> for TextQuery {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let from_url = Query::<SearchTextForm>::try_from_uri(req.uri())
            .map(|Query(form)| form.query)
            .unwrap_or_default();

        match query_from_body(req, state).await {
            Ok(query) if !query.trim().is_empty() => Ok(Self(query)),
            Ok(_) => Ok(Self(from_url)),
            Err(_) if !from_url.trim().is_empty() => Ok(Self(from_url)),
            Err(e) => Err(e),
        }
    }
}

async fn query_from_body<S: Send + Sync>(req: Request, state: &S) -> Result<String> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let TypedMultipart(form) =
            TypedMultipart::<SearchTextMultipart>::from_request(req, state).await.map_err(|e| {
                warn!("解析表单失败: {e}");
                AppError::BadRequest("Error parsing form")
            })?;
        Ok(form.query.unwrap_or_default())
    } else {
        let Form(form) = Form::<SearchTextForm>::from_request(req, state).await.map_err(|e| {
            warn!("解析表单失败: {e}");
            AppError::BadRequest("Error parsing form")
        })?;
        Ok(form.query)
    }
}

/// 路径中的 ID 只允许由数字组成
fn parse_id(id: &str) -> Option<i64> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    timeout(limit, fut).await.map_err(|_| anyhow!("查询超时 ({limit:?})"))?
}

async fn observe(
    kind: QueryKind,
    fut: impl Future<Output = anyhow::Result<Vec<i64>>>,
) -> anyhow::Result<Vec<i64>> {
    let start = Instant::now();
    let result = fut.await;
    metrics::observe_search(kind, start.elapsed(), result.as_ref().ok().map(Vec::len));
    result
}

fn render(mut ids: Vec<i64>, limit: u32) -> Json<SearchResponse> {
    ids.truncate(limit as usize);
    Json(SearchResponse { ids })
}
