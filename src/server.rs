use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use anyhow::Context as AnyhowContext;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal};
use tokio_stream::{wrappers::WatchStream, StreamExt};

use crate::{
    cli::CliArgs,
    controller::{Controller, ControllerError, FAILURE_NOTICE},
    error::Result,
    generation::CarGenerator,
    model::{CarModel, ConfigOptions},
    util::decode_data_uri,
    views::IndexTemplate,
};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

type SharedState<G> = Arc<Controller<G>>;

pub async fn run_web_server<G: CarGenerator + 'static>(
    args: &CliArgs,
    controller: SharedState<G>,
) -> Result<()> {
    let listen = args
        .listen
        .clone()
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("parsing listen address `{listen}`"))?;

    let listener = TcpListener::bind(addr)
        .await
        .context("binding configurator server address")?;
    println!(
        "AutoForge configurator listening on http://{}",
        listener.local_addr().unwrap_or(addr)
    );

    axum::serve(listener, router(controller))
        .with_graceful_shutdown(async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::warn!("failed to listen for shutdown signal: {err:?}");
            }
            println!("Shutdown signal received; stopping server…");
        })
        .await
        .context("running configurator server")?;

    Ok(())
}

pub fn router<G: CarGenerator + 'static>(controller: SharedState<G>) -> Router {
    Router::new()
        .route("/", get(index_page::<G>))
        .route("/generate", post(generate_form::<G>))
        .route("/history/:id", post(select_form::<G>))
        .route("/images/:id", get(car_image::<G>))
        .route("/api/state", get(api_state::<G>))
        .route("/api/generate", post(api_generate::<G>))
        .route("/api/history/:id/select", post(api_select::<G>))
        .route("/api/stage", get(stage_events::<G>))
        .with_state(controller)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type: error_type.to_string(),
                },
            },
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found_error", message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict_error", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("internal server error: {message}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    fn upstream() -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "upstream_error", FAILURE_NOTICE)
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::AlreadyGenerating => Self::conflict(err.to_string()),
            ControllerError::Generation(_) => Self::upstream(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    #[serde(default)]
    failed: Option<u8>,
    #[serde(default)]
    busy: Option<u8>,
}

impl PageQuery {
    fn notice(&self) -> Option<&'static str> {
        if self.failed.is_some() {
            Some(FAILURE_NOTICE)
        } else if self.busy.is_some() {
            Some("A concept is already on the assembly line. Hang tight.")
        } else {
            None
        }
    }
}

async fn index_page<G: CarGenerator>(
    State(controller): State<SharedState<G>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let template = IndexTemplate::new(&controller.snapshot(), query.notice());
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => ApiError::internal(format!("failed to render page: {err}")).into_response(),
    }
}

async fn generate_form<G: CarGenerator>(
    State(controller): State<SharedState<G>>,
    Form(config): Form<ConfigOptions>,
) -> Redirect {
    match controller.generate_with(config).await {
        Ok(_) => Redirect::to("/"),
        Err(ControllerError::AlreadyGenerating) => Redirect::to("/?busy=1"),
        Err(ControllerError::Generation(_)) => Redirect::to("/?failed=1"),
    }
}

async fn select_form<G: CarGenerator>(
    State(controller): State<SharedState<G>>,
    Path(id): Path<String>,
) -> Redirect {
    controller.select_history(&id);
    Redirect::to("/")
}

async fn car_image<G: CarGenerator>(
    State(controller): State<SharedState<G>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let car = controller
        .find(&id)
        .ok_or_else(|| ApiError::not_found(format!("Unknown concept `{id}`")))?;
    if !car.has_image() {
        return Err(ApiError::not_found(format!("Concept `{id}` has no image")));
    }
    let image = decode_data_uri(&car.image_url)
        .map_err(|err| ApiError::internal(format!("stored image is unreadable: {err}")))?;
    Ok(([(CONTENT_TYPE, image.mime)], image.bytes).into_response())
}

async fn api_state<G: CarGenerator>(State(controller): State<SharedState<G>>) -> Response {
    Json(controller.snapshot()).into_response()
}

async fn api_generate<G: CarGenerator>(
    State(controller): State<SharedState<G>>,
    Json(config): Json<ConfigOptions>,
) -> ApiResult<Json<CarModel>> {
    Ok(Json(controller.generate_with(config).await?))
}

async fn api_select<G: CarGenerator>(
    State(controller): State<SharedState<G>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CarModel>> {
    controller
        .select_history(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Unknown archive entry `{id}`")))
}

/// Streams the stage label; an empty payload means idle.
async fn stage_events<G: CarGenerator>(State(controller): State<SharedState<G>>) -> Response {
    let stream = WatchStream::new(controller.subscribe()).map(|stage| {
        let label = stage.map(|stage| stage.to_string()).unwrap_or_default();
        Ok::<Event, Infallible>(Event::default().data(label))
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
