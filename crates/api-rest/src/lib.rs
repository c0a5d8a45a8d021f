//! # API REST
//!
//! REST surface over the discharge panel.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Mapping workflow errors to status codes
//!
//! All handlers share one [`DischargePanel`] behind an async mutex, so a discharge and the
//! statistics refresh that follows it are never interleaved with another request.

#![warn(rust_2018_idioms)]

pub mod dto;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use discharge_core::{
    DischargeError, DischargeForm, DischargePanel, Mrn, RecordKey, RecordKind, SearchFilter,
    TracingNotifier,
};
use discharge_store::StoreBackend;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use dto::{
    DischargeReq, DischargeRes, HealthRes, RecordRes, RecordsQuery, RecordsRes, StatisticRes,
    StatisticsRes,
};

/// Panel type served by the REST API.
pub type Panel = DischargePanel<StoreBackend, TracingNotifier>;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    panel: Arc<Mutex<Panel>>,
    store_name: &'static str,
}

impl AppState {
    pub fn new(panel: Panel, store_name: &'static str) -> Self {
        Self {
            panel: Arc::new(Mutex::new(panel)),
            store_name,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_records,
        reload_records,
        get_statistics,
        refresh_statistics,
        discharge,
    ),
    components(schemas(
        HealthRes,
        RecordRes,
        RecordsRes,
        StatisticRes,
        StatisticsRes,
        DischargeReq,
        DischargeRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/records", get(list_records))
        .route("/records/reload", post(reload_records))
        .route("/statistics", get(get_statistics))
        .route("/statistics/refresh", post(refresh_statistics))
        .route("/discharge", post(discharge))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Status code and client message for a workflow error.
///
/// The full error is logged; clients only get the static message.
pub fn error_response(error: &DischargeError) -> (StatusCode, &'static str) {
    match error {
        DischargeError::Validation(_) => (
            StatusCode::BAD_REQUEST,
            "Discharge date and time are required",
        ),
        DischargeError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        DischargeError::NoSelection | DischargeError::RecordNotFound(_) => (
            StatusCode::CONFLICT,
            "Record is not in the active list",
        ),
        DischargeError::RemoteRead(_)
        | DischargeError::RemoteCount(_)
        | DischargeError::RemoteWrite(_) => {
            (StatusCode::BAD_GATEWAY, "Record store request failed")
        }
        DischargeError::InvalidConfig(_)
        | DischargeError::ConfigYaml(_)
        | DischargeError::ConfigRead(_)
        | DischargeError::InvalidDayWindow(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn log_and_map(context: &str, error: DischargeError) -> (StatusCode, &'static str) {
    tracing::error!("{context} error: {:?}", error);
    error_response(&error)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Discharge REST API is alive".into(),
        store: state.store_name.into(),
    })
}

#[utoipa::path(
    get,
    path = "/records",
    params(RecordsQuery),
    responses(
        (status = 200, description = "Active admissions and consultations", body = RecordsRes)
    )
)]
/// List the active records currently loaded in the panel
///
/// Filtering happens over the loaded list; no remote call is made.
///
/// # Arguments
/// * `query` - Optional free-text `search` and exact `specialty`
///
/// # Returns
/// * `Json<RecordsRes>` - Matching records in list order and the unfiltered total
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Json<RecordsRes> {
    let filter = SearchFilter::new(query.search.unwrap_or_default(), query.specialty);
    let panel = state.panel.lock().await;

    let records = panel
        .visible_records(&filter)
        .into_iter()
        .map(RecordRes::from)
        .collect();

    Json(RecordsRes {
        records,
        total: panel.records().len(),
    })
}

#[utoipa::path(
    post,
    path = "/records/reload",
    responses(
        (status = 200, description = "Reloaded active records", body = RecordsRes),
        (status = 502, description = "Record store request failed")
    )
)]
/// Reload the active list from the record store
///
/// # Errors
/// Returns `502 Bad Gateway` if either table cannot be read. The panel list is then empty.
#[axum::debug_handler]
async fn reload_records(
    State(state): State<AppState>,
) -> Result<Json<RecordsRes>, (StatusCode, &'static str)> {
    let mut panel = state.panel.lock().await;
    panel
        .load_active_records()
        .await
        .map_err(|e| log_and_map("Reload records", e))?;

    let records: Vec<RecordRes> = panel.records().iter().map(RecordRes::from).collect();
    let total = records.len();
    Ok(Json(RecordsRes { records, total }))
}

#[utoipa::path(
    get,
    path = "/statistics",
    responses(
        (status = 200, description = "Today's discharge statistics", body = StatisticsRes)
    )
)]
/// Today's statistics as last computed
#[axum::debug_handler]
async fn get_statistics(State(state): State<AppState>) -> Json<StatisticsRes> {
    let panel = state.panel.lock().await;
    Json(StatisticsRes {
        statistics: panel.statistics().iter().map(StatisticRes::from).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/statistics/refresh",
    responses(
        (status = 200, description = "Recomputed statistics", body = StatisticsRes),
        (status = 502, description = "Record store request failed")
    )
)]
/// Recompute today's statistics
///
/// # Errors
/// Returns `502 Bad Gateway` if any count fails. The previous statistics stay in place.
#[axum::debug_handler]
async fn refresh_statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsRes>, (StatusCode, &'static str)> {
    let mut panel = state.panel.lock().await;
    panel
        .refresh_statistics()
        .await
        .map_err(|e| log_and_map("Refresh statistics", e))?;

    Ok(Json(StatisticsRes {
        statistics: panel.statistics().iter().map(StatisticRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/discharge",
    request_body = DischargeReq,
    responses(
        (status = 200, description = "Record discharged", body = DischargeRes),
        (status = 400, description = "Missing date or time, or unknown kind"),
        (status = 409, description = "Record is not in the active list"),
        (status = 502, description = "Record store request failed")
    )
)]
/// Discharge an admission or complete a consultation
///
/// Selects the record in the panel, fills the form from the request and submits it.
///
/// # Arguments
/// * `req` - Record kind and MRN, discharge date and time, optional note
///
/// # Returns
/// * `Ok(Json<DischargeRes>)` - The discharged record and the confirmation message
/// * `Err((StatusCode, &str))` - See the documented responses
#[axum::debug_handler]
async fn discharge(
    State(state): State<AppState>,
    Json(req): Json<DischargeReq>,
) -> Result<Json<DischargeRes>, (StatusCode, &'static str)> {
    let kind: RecordKind = req
        .kind
        .parse()
        .map_err(|e| log_and_map("Discharge", e))?;
    let mrn = Mrn::new(&req.mrn).map_err(|_| (StatusCode::BAD_REQUEST, "MRN is required"))?;

    let mut panel = state.panel.lock().await;
    panel
        .select(RecordKey::new(kind, mrn))
        .map_err(|e| log_and_map("Discharge", e))?;
    panel.set_form(DischargeForm::new(req.date, req.time, req.note));

    let outcome = panel
        .submit_discharge()
        .await
        .map_err(|e| log_and_map("Discharge", e))?;

    Ok(Json(DischargeRes::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chrono::Utc;
    use discharge_core::store::memory::StoreOperation;
    use discharge_core::{CoreConfig, InMemoryStore, Specialty};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn seeded_store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.insert(
            "admissions",
            json!({
                "mrn": "A1",
                "patient_name": "John Doe",
                "admission_date": "2024-02-20",
                "status": "Active",
                "specialty": "Neurology"
            }),
        );
        store.insert(
            "consultations",
            json!({
                "mrn": "C1",
                "patient_name": "Jane Roe",
                "created_at": "2024-02-28T09:00:00Z",
                "status": "Active",
                "consultation_specialty": "Hematology"
            }),
        );
        store.insert(
            "consultations",
            json!({
                "mrn": "C0",
                "patient_name": "Earlier Today",
                "created_at": "2024-02-27T09:00:00Z",
                "status": "Completed",
                "consultation_specialty": "Hematology",
                "updated_at": Utc::now().to_rfc3339()
            }),
        );
        Arc::new(store)
    }

    async fn app_with(store: Arc<InMemoryStore>) -> Router {
        let cfg = CoreConfig::new(vec![
            Specialty::new("Neurology").unwrap(),
            Specialty::new("Hematology").unwrap(),
        ])
        .expect("config should be valid");
        let mut panel = Panel::new(
            Arc::new(cfg),
            StoreBackend::Memory(store),
            TracingNotifier,
        );
        panel.initial_load().await.ok();
        router(AppState::new(panel, "memory"))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("request should be handled");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_store() {
        let app = app_with(seeded_store()).await;
        let (status, body) = send(&app, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_list_records_merges_both_kinds() {
        let app = app_with(seeded_store()).await;
        let (status, body) = send(&app, get("/records")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["records"][0]["kind"], "admission");
        assert_eq!(body["records"][0]["mrn"], "A1");
        assert_eq!(body["records"][1]["kind"], "consultation");
        assert_eq!(body["records"][1]["specialty"], "Hematology");
    }

    #[tokio::test]
    async fn test_list_records_applies_search_and_specialty() {
        let app = app_with(seeded_store()).await;

        let (_, body) = send(&app, get("/records?search=jane")).await;
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
        assert_eq!(body["records"][0]["mrn"], "C1");
        assert_eq!(body["total"], 2);

        let (_, body) = send(&app, get("/records?specialty=Neurology&search=Jane")).await;
        assert!(body["records"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics_count_todays_completions() {
        let app = app_with(seeded_store()).await;
        let (status, body) = send(&app, get("/statistics")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["statistics"],
            json!([{
                "specialty": "Hematology",
                "admissions_discharged": 0,
                "consultations_completed": 1
            }])
        );
    }

    #[tokio::test]
    async fn test_discharge_admission_updates_list_and_statistics() {
        let store = seeded_store();
        let app = app_with(store.clone()).await;

        let (status, body) = send(
            &app,
            post_json(
                "/discharge",
                json!({
                    "kind": "admission",
                    "mrn": "A1",
                    "date": "2024-03-01",
                    "time": "14:30",
                    "note": "stable"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Patient John Doe discharged");
        assert_eq!(store.updates().len(), 1);

        let (_, records) = send(&app, get("/records")).await;
        assert_eq!(records["total"], 1);
        assert_eq!(records["records"][0]["mrn"], "C1");

        let (_, stats) = send(&app, get("/statistics")).await;
        let neurology = stats["statistics"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["specialty"] == "Neurology")
            .cloned()
            .expect("Neurology should have activity");
        assert_eq!(neurology["admissions_discharged"], 1);
    }

    #[tokio::test]
    async fn test_repeated_discharge_is_conflict_without_second_write() {
        let store = seeded_store();
        let app = app_with(store.clone()).await;
        let request = json!({
            "kind": "admission",
            "mrn": "A1",
            "date": "2024-03-01",
            "time": "14:30"
        });

        let (first, _) = send(&app, post_json("/discharge", request.clone())).await;
        assert_eq!(first, StatusCode::OK);

        let (second, _) = send(&app, post_json("/discharge", request)).await;
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(store.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_discharge_without_time_is_bad_request() {
        let store = seeded_store();
        let app = app_with(store.clone()).await;

        let (status, _) = send(
            &app,
            post_json(
                "/discharge",
                json!({"kind": "admission", "mrn": "A1", "date": "2024-03-01", "time": ""}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_discharge_unknown_record_is_conflict() {
        let app = app_with(seeded_store()).await;
        let (status, _) = send(
            &app,
            post_json(
                "/discharge",
                json!({"kind": "consultation", "mrn": "A1", "date": "2024-03-01", "time": "10:00"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_discharge_unknown_kind_is_bad_request() {
        let app = app_with(seeded_store()).await;
        let (status, _) = send(
            &app,
            post_json(
                "/discharge",
                json!({"kind": "transfer", "mrn": "A1", "date": "2024-03-01", "time": "10:00"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_write_failure_is_bad_gateway_and_keeps_record() {
        let store = seeded_store();
        let app = app_with(store.clone()).await;
        store.fail(StoreOperation::Update, "consultations");

        let (status, _) = send(
            &app,
            post_json(
                "/discharge",
                json!({"kind": "consultation", "mrn": "C1", "date": "2024-03-01", "time": "10:00"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (_, records) = send(&app, get("/records")).await;
        assert_eq!(records["total"], 2);
    }

    #[tokio::test]
    async fn test_reload_failure_is_bad_gateway() {
        let store = seeded_store();
        let app = app_with(store.clone()).await;
        store.fail(StoreOperation::Select, "admissions");

        let (status, _) = send(&app, post_json("/records/reload", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (_, records) = send(&app, get("/records")).await;
        assert_eq!(records["total"], 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_statistics() {
        let store = seeded_store();
        let app = app_with(store.clone()).await;
        store.fail(StoreOperation::Count, "consultations");

        let (status, _) = send(&app, post_json("/statistics/refresh", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (_, stats) = send(&app, get("/statistics")).await;
        assert_eq!(stats["statistics"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_error_response_mapping() {
        assert_eq!(
            error_response(&DischargeError::NoSelection).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_response(&DischargeError::Validation("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&DischargeError::InvalidConfig("x".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
