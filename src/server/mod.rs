mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::error::AppError;
pub use self::state::*;
pub use self::types::SearchResponse;
use crate::db::ImageStore;

#[derive(OpenApi)]
#[openapi(
    paths(api::image_handler, api::search_image_handler, api::search_text_handler),
    components(schemas(types::SearchImageForm, types::SearchTextForm, types::SearchResponse))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app<S: ImageStore>(state: Arc<AppState<S>>) -> Router {
    let upload_limit = state.config.max_upload_size;

    Router::new()
        .route(
            "/image/{id}",
            get(api::image_handler::<S>).fallback(api::method_not_allowed),
        )
        .route(
            "/search/image/",
            post(api::search_image_handler::<S>)
                // 上传限制，超出时 multipart 解析失败并返回 400
                .layer(DefaultBodyLimit::max(upload_limit))
                .fallback(api::method_not_allowed),
        )
        .route(
            "/search/text/",
            post(api::search_text_handler::<S>).fallback(api::method_not_allowed),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
