use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ip_info::IpInfoApi,
    protocol::{self, ProtocolConfigurable},
    Error, ProxyManager,
};

#[derive(Clone)]
pub struct Ctx {
    pub proxy_manager: ProxyManager,
    pub ip_info: Arc<dyn IpInfoApi>,
}

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

/// An API error serializable to JSON.
#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = if self.0.is_index_out_of_range() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("api error: {:?}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = ErrorMessage {
            code: code.as_u16(),
            message: self.0.to_string(),
        };
        (code, Json(message)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn wire<T: Serialize + ?Sized>(value: &T) -> ApiResult {
    Ok(Json(protocol::to_value(value)?))
}

#[derive(Debug, Deserialize)]
pub struct AddProxy {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectProxy {
    pub index: usize,
}

pub async fn get_proxies(Extension(ctx): Extension<Ctx>) -> ApiResult {
    wire(&ctx.proxy_manager.proxies())
}

pub async fn post_proxies(Extension(ctx): Extension<Ctx>, Json(body): Json<AddProxy>) -> ApiResult {
    ctx.proxy_manager
        .add_proxy(body.host, body.port, &body.username, &body.password)
        .await?;
    wire(&ctx.proxy_manager.proxies())
}

pub async fn delete_proxies(
    Extension(ctx): Extension<Ctx>,
    Path(index): Path<usize>,
) -> ApiResult {
    ctx.proxy_manager.remove_proxy(index).await?;
    wire(&ctx.proxy_manager.proxies())
}

pub async fn get_proxy(Extension(ctx): Extension<Ctx>) -> ApiResult {
    wire(&ctx.proxy_manager.current_proxy())
}

pub async fn put_proxy(Extension(ctx): Extension<Ctx>, Json(body): Json<SelectProxy>) -> ApiResult {
    ctx.proxy_manager.set_proxy(body.index).await?;
    wire(&ctx.proxy_manager.current_proxy())
}

pub async fn delete_proxy(Extension(ctx): Extension<Ctx>) -> ApiResult {
    ctx.proxy_manager.unset_proxy().await?;
    wire(&ctx.proxy_manager.current_proxy())
}

pub async fn get_config(Extension(ctx): Extension<Ctx>) -> ApiResult {
    wire(&ProtocolConfigurable(&ctx.proxy_manager))
}

pub async fn get_ip(Extension(ctx): Extension<Ctx>) -> ApiResult {
    wire(&ctx.ip_info.local_ip_info())
}
