use axum::{
    body::Body,
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{
    handlers::{self, Ctx},
    ApiServer,
};

impl ApiServer {
    pub fn routes(&self) -> Router {
        Router::new()
            .nest("/api", self.api())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]),
            )
            .layer(TraceLayer::new_for_http())
    }

    fn api(&self) -> Router {
        let ctx = Ctx {
            proxy_manager: self.proxy_manager.clone(),
            ip_info: self.ip_info.clone(),
        };

        let mut router = Router::new()
            .route(
                "/proxies",
                get(handlers::get_proxies).post(handlers::post_proxies),
            )
            .route("/proxies/:index", delete(handlers::delete_proxies))
            .route(
                "/proxy",
                get(handlers::get_proxy)
                    .put(handlers::put_proxy)
                    .delete(handlers::delete_proxy),
            )
            .route("/config", get(handlers::get_config))
            .route("/ip", get(handlers::get_ip))
            .layer(Extension(ctx));

        if let Some(token) = &self.access_token {
            let token = token.clone();
            router = router.route_layer(middleware::from_fn(move |req: Request<Body>, next: Next<Body>| {
                let token = token.clone();
                auth(req, next, token)
            }))
        }

        router
    }
}

#[derive(Deserialize)]
struct AuthQuery {
    token: String,
}

async fn auth(req: Request<Body>, next: Next<Body>, token: String) -> impl IntoResponse {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let query = req.uri().query().unwrap_or_default();
    let value = serde_urlencoded::from_str(query)
        .ok()
        .map(|i: AuthQuery| i.token);

    let authorized = matches!(auth_header.or(value.as_deref()), Some(t) if t == token);
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}
