#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, Request},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use mquery::{
    BedrockStatus, ErrorCode, JavaStatus, MinecraftServerError, QueryError, StatusOptions,
    StatusResult, ValidationError, DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[macro_use]
extern crate tracing;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() {
    start_tracing();
    let port: u16 = std::env::var("PORT").map_or(DEFAULT_PORT, |v| v.parse().unwrap());
    let app = axum::Router::new()
        .route("/api/:address", get(handle_auto_ping))
        .route("/api/java/:address", get(handle_java_ping))
        .route("/api/bedrock/:address", get(handle_bedrock_ping))
        .layer(axum::middleware::from_fn(noindex_cache))
        .layer(TraceLayer::new_for_http());
    let socket_address = SocketAddr::from(([0, 0, 0, 0], port));
    let tcp = TcpListener::bind(socket_address).await.unwrap();
    info!(%socket_address, "listening");
    axum::serve(tcp, app)
        .with_graceful_shutdown(vss::shutdown_signal())
        .await
        .unwrap();
}

static ROBOTS_NAME: HeaderName = HeaderName::from_static("x-robots-tag");
static ROBOTS_VALUE: HeaderValue = HeaderValue::from_static("noindex");
static CACHE_CONTROL_AGE: HeaderValue = HeaderValue::from_static("s-maxage=30");

async fn noindex_cache(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut()
        .insert(ROBOTS_NAME.clone(), ROBOTS_VALUE.clone());
    resp.headers_mut()
        .insert(CACHE_CONTROL, CACHE_CONTROL_AGE.clone());
    resp
}

async fn handle_auto_ping(
    Path(address): Path<String>,
    Query(options): Query<StatusOptions>,
) -> Result<Json<StatusResult>, Failure> {
    let (host, port) = mquery::split_address(&address)?;
    Ok(Json(mquery::auto_detect(host, port, &options).await?))
}

async fn handle_java_ping(
    Path(address): Path<String>,
    Query(options): Query<StatusOptions>,
) -> Result<Json<JavaStatus>, Failure> {
    let (host, port) = mquery::split_address(&address)?;
    let port = port.unwrap_or(DEFAULT_JAVA_PORT.into());
    Ok(Json(mquery::status(host, port, &options).await?))
}

async fn handle_bedrock_ping(
    Path(address): Path<String>,
    Query(options): Query<StatusOptions>,
) -> Result<Json<BedrockStatus>, Failure> {
    let (host, port) = mquery::split_address(&address)?;
    let port = port.unwrap_or(DEFAULT_BEDROCK_PORT.into());
    Ok(Json(mquery::status_bedrock(host, port, &options).await?))
}

#[derive(thiserror::Error, Debug)]
pub enum Failure {
    #[error("{0}")]
    BadRequest(#[from] ValidationError),
    #[error("{0}")]
    ConnectionFailed(#[from] MinecraftServerError),
}

impl From<QueryError> for Failure {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::Validation(error) => Self::BadRequest(error),
            QueryError::Server(error) => Self::ConnectionFailed(error),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        // an offline server is a successful lookup as far as HTTP is concerned
        let (status, code) = match &self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            Self::ConnectionFailed(error) => (StatusCode::OK, Some(error.code)),
        };
        match &self {
            Self::BadRequest(error) => debug!(%error, "rejected request"),
            Self::ConnectionFailed(error) => {
                info!(host = %error.host, port = error.port, cause = %error.cause_code(), %error, "server offline");
            }
        }
        let ser = ErrorSerialization {
            error: self.to_string(),
            code,
        };
        (status, Json(ser)).into_response()
    }
}

#[derive(serde::Serialize)]
pub struct ErrorSerialization {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

pub struct Json<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        static JSON_CTYPE: HeaderValue = HeaderValue::from_static("application/json;charset=utf-8");

        let body = serde_json::to_vec_pretty(&self.0).unwrap_or_else(|_| {
            r#"{"error": "JSON Serialization failed, please make a bug report"}"#
                .as_bytes()
                .to_vec()
        });
        ([(CONTENT_TYPE, JSON_CTYPE.clone())], body).into_response()
    }
}

fn start_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("mquery_web=info".parse().unwrap())
        .with_env_var("LOG")
        .from_env()
        .expect("failed to parse env");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}
