use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};

/// API错误类型
///
/// 所有错误都以纯文本返回。`Internal` 只返回最外层的 context 信息，完整错误链写入日志
#[derive(Debug)]
pub enum AppError {
    /// 请求参数错误
    BadRequest(&'static str),
    /// 资源不存在
    NotFound(&'static str),
    /// 请求方法不被允许
    MethodNotAllowed,
    /// 后端错误
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => {
                warn!("请求错误: {msg}");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            Self::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
            }
            Self::Internal(err) => {
                error!("请求处理失败: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
