use axum::{
    extract::Extension,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put, MethodRouter},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, rate_limit_middleware, with_security_headers, RateLimiter};
use crate::store::{DocumentStore, StoreHandle};

/// Full application router over `store`.
pub fn app(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(bootcamp_routes())
        .merge(course_routes())
        .merge(auth_routes())
        .merge(user_routes())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(StoreHandle(store)))
                .layer(cors_layer(&config.security.cors_origins)),
        );

    let router = if config.api.enable_security_headers {
        with_security_headers(router, config.security.require_https)
    } else {
        router
    };

    let router = if config.api.enable_rate_limiting {
        let limiter = RateLimiter::from_config(&config.api);
        router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    } else {
        router
    };

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Wraps a method router in JWT authentication.
fn protected(route: MethodRouter) -> MethodRouter {
    route.route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn bootcamp_routes() -> Router {
    Router::new()
        .route(
            "/api/v1/bootcamps",
            get(public::bootcamps::list).merge(protected(post(protected::bootcamps::create))),
        )
        .route(
            "/api/v1/bootcamps/:id",
            get(public::bootcamps::get).merge(protected(
                put(protected::bootcamps::update).delete(protected::bootcamps::delete),
            )),
        )
        // Nested course collection shares the `:id` segment with the bootcamp routes
        .route(
            "/api/v1/bootcamps/:id/courses",
            get(public::courses::list_for_bootcamp).merge(protected(post(protected::courses::create))),
        )
}

fn course_routes() -> Router {
    Router::new()
        .route("/api/v1/courses", get(public::courses::list))
        .route(
            "/api/v1/courses/:id",
            get(public::courses::get).merge(protected(
                put(protected::courses::update).delete(protected::courses::delete),
            )),
        )
}

fn auth_routes() -> Router {
    Router::new()
        .route("/api/v1/auth/register", post(public::auth::register))
        .route("/api/v1/auth/login", post(public::auth::login))
        .route("/api/v1/auth/logout", protected(get(protected::auth::logout)))
        .route("/api/v1/auth/me", protected(get(protected::auth::me)))
        .route("/api/v1/auth/updatedetails", protected(put(protected::auth::update_details)))
        .route("/api/v1/auth/updatepassword", protected(put(protected::auth::update_password)))
}

fn user_routes() -> Router {
    Router::new()
        .route("/api/v1/users", protected(get(elevated::users::list)))
        .route("/api/v1/users/:id", protected(get(elevated::users::get)))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if allowed.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": version,
            "description": "Bootcamp directory API with filtered, sorted and paginated listings",
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (public read, publisher write)",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses (public read, publisher write)",
                "auth": "/api/v1/auth/{register,login,logout,me,updatedetails,updatepassword}",
                "users": "/api/v1/users[/:id] (admin)",
            },
            "query": {
                "select": "select=name,description",
                "sort": "sort=-averageCost,name",
                "page": "page=2&limit=10",
                "filter": "averageCost[lte]=10000&careers[in]=Business,UI/UX&housing=true",
            }
        }
    }))
}

async fn health(Extension(StoreHandle(store)): Extension<StoreHandle>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
