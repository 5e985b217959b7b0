use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use cep_weather_core::{
    Config, ErrorKind, HistoryStore, LoadPolicy, LookupError, LookupService, Resolvers,
    SearchRecord, SortDirection, SortKey, SortState, UpsertStrategy, history,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::view;

#[derive(Debug, Clone)]
pub struct AppState {
    lookup: LookupService,
    load_policy: LoadPolicy,
    upsert: UpsertStrategy,
}

impl AppState {
    pub fn new(lookup: LookupService, config: &Config) -> Self {
        Self { lookup, load_policy: config.load_policy(), upsert: config.history.upsert }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    #[serde(default)]
    cep: String,
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    cep: Option<String>,
    sort: Option<String>,
    dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A lookup failure on its way out as JSON.
#[derive(Debug)]
pub struct ApiError(LookupError);

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        (status, Json(ErrorBody { error: self.0.user_message() })).into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::NotFound => StatusCode::BAD_REQUEST,
        ErrorKind::Service => StatusCode::BAD_GATEWAY,
    }
}

fn log_failure(err: &LookupError) {
    match err.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => info!(error = %err, "lookup rejected"),
        ErrorKind::Service => warn!(error = %err, "lookup failed upstream"),
    }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let resolvers = Resolvers::from_config(&config)?;
    let state = AppState::new(LookupService::from(resolvers), &config);
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/get-weather", get(get_weather).fallback(method_not_allowed))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody { error: "Método não permitido".to_string() }),
    )
}

async fn get_weather(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<SearchRecord>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        let err = rejected_query(&rejection);
        log_failure(&err);
        err
    })?;
    let record = state.lookup.lookup(&query.cep).await.inspect_err(log_failure)?;
    Ok(Json(record))
}

/// A query string serde can't take apart (e.g. `cep` given twice) is a bad CEP.
fn rejected_query(rejection: &QueryRejection) -> LookupError {
    LookupError::InvalidCep(rejection.body_text())
}

async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let (query, rejected) = match query {
        Ok(Query(query)) => (query, None),
        Err(rejection) => (PageQuery::default(), Some(rejected_query(&rejection))),
    };

    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(history::cookie_value);
    let mut store = HistoryStore::load(cookie, state.load_policy);

    let mut outcome = None;
    let mut set_cookie = None;
    if let Some(err) = rejected {
        log_failure(&err);
        outcome = Some(Err(err.user_message()));
    } else if let Some(raw) = query.cep.as_deref() {
        match state.lookup.lookup(raw).await {
            Ok(record) => {
                store = store.upsert(record.clone(), state.upsert);
                set_cookie = history_cookie(&store);
                outcome = Some(Ok(record));
            }
            Err(err) => {
                log_failure(&err);
                outcome = Some(Err(err.user_message()));
            }
        }
    }

    let store = store.with_sort(sort_from_query(&query));
    let html = view::render(&view::Page {
        cep: query.cep.as_deref().unwrap_or_default(),
        outcome: outcome.as_ref().map(|o| o.as_ref().map_err(String::clone)),
        history: &store,
    });

    let mut response = Html(html).into_response();
    if let Some(value) = set_cookie {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

fn history_cookie(store: &HistoryStore) -> Option<HeaderValue> {
    let value = match store.set_cookie_header(Utc::now()) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "failed to encode history cookie");
            return None;
        }
    };
    HeaderValue::from_str(&value)
        .inspect_err(|error| warn!(%error, "history cookie is not a valid header value"))
        .ok()
}

/// Unknown columns or directions fall back to insertion order.
fn sort_from_query(query: &PageQuery) -> Option<SortState> {
    let key = SortKey::try_from(query.sort.as_deref()?).ok()?;
    let direction = query
        .dir
        .as_deref()
        .and_then(|d| SortDirection::try_from(d).ok())
        .unwrap_or_default();
    Some(SortState { key, direction })
}
