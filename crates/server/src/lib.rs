//! Server crate provides HTTP server functionality.
//!
//! This module implements the REST surface of the booking backend: thin
//! handlers that map JSON payloads onto the service layer, render opaque
//! success/error responses, and expose health and metrics endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::{NaiveDate, NaiveTime};
use model::{NewOrderRequest, NewUserRequest, OrderStatus};
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use serde::Deserialize;
use serde_json::json;
use service::catalog::CatalogService;
use service::rating::RatingService;
use service::users::UserService;
use service::{OrderService, ServiceError};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Server represents the HTTP server of the booking backend.
pub struct Server {
    port: String,
    state: AppState,
}

/// Application state shared between request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderService>,
    pub users: Arc<dyn UserService>,
    pub catalog: Arc<dyn CatalogService>,
    pub ratings: Arc<dyn RatingService>,
    metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        orders: Arc<dyn OrderService>,
        users: Arc<dyn UserService>,
        catalog: Arc<dyn CatalogService>,
        ratings: Arc<dyn RatingService>,
    ) -> Self {
        Self {
            orders,
            users,
            catalog,
            ratings,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Metrics collects and exposes HTTP server metrics.
struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )
        .expect("Failed to create errors_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total
            .with_label_values(&[source, endpoint])
            .inc();
    }
}

// ---------------------------------------------------------------------------
// Request bodies of the lifecycle mutators
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CancelBody {
    #[serde(default)]
    comment_cancel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    comment: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    order_status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct RescheduleBody {
    #[serde(default)]
    cleaning_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "model::flexible_time::option")]
    cleaning_time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize)]
struct RatingBody {
    user: i32,
    #[serde(default)]
    text: String,
    score: i16,
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ServicesQuery {
    #[serde(default)]
    additional: bool,
}

/// Maps a service-layer failure onto an HTTP response. Validation problems
/// and the duplicate-order condition are the caller's fault; everything
/// else is a server error and is logged.
fn service_error_response(endpoint: &str, err: ServiceError) -> Response {
    match err {
        ServiceError::Validation(message) => {
            (StatusCode::BAD_REQUEST, axum::Json(json!({ "detail": message }))).into_response()
        }
        ServiceError::DuplicateOrder => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "Статус": "Заказ уже был создан." })),
        )
            .into_response(),
        ServiceError::NotFound => {
            (StatusCode::NOT_FOUND, axum::Json(json!({ "detail": "Не найдено." }))).into_response()
        }
        other => {
            error!("Internal error at {}: {}", endpoint, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({ "detail": "Внутренняя ошибка сервера." })),
            )
                .into_response()
        }
    }
}

impl Server {
    /// Creates a new Server instance listening on the given port.
    pub fn new(port: String, state: AppState) -> Self {
        info!("Initializing HTTP server on port {}", port);
        Self { port, state }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let metrics = self.state.metrics.clone();

        Router::new()
            .route("/api/orders", post(Self::handle_create_order))
            .route("/api/orders/{id}", get(Self::handle_get_order))
            .route("/api/orders/{id}/pay", patch(Self::handle_pay))
            .route("/api/orders/{id}/cancel", patch(Self::handle_cancel))
            .route("/api/orders/{id}/comment", patch(Self::handle_comment))
            .route("/api/orders/{id}/datetime", patch(Self::handle_reschedule))
            .route("/api/orders/{id}/status", patch(Self::handle_change_status))
            .route("/api/orders/{id}/rating", post(Self::handle_create_rating))
            .route("/api/users", post(Self::handle_register))
            .route("/api/users/confirm-email", post(Self::handle_confirm_email))
            .route("/api/users/{id}", get(Self::handle_get_user))
            .route("/api/users/{id}/orders", get(Self::handle_user_orders))
            .route("/api/cleaning-types", get(Self::handle_cleaning_types))
            .route("/api/services", get(Self::handle_services))
            .route("/api/ratings", get(Self::handle_ratings))
            .route("/health", get(Self::handle_health))
            .route("/metrics", get(Self::handle_metrics))
            .layer(axum::middleware::from_fn_with_state(
                metrics,
                Self::metrics_middleware,
            ))
            .with_state(self.state.clone())
    }

    /// Middleware for collecting metrics on HTTP requests.
    async fn metrics_middleware(
        State(metrics): State<Arc<Metrics>>,
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let start = std::time::Instant::now();
        let response = next.run(req).await;
        let status = response.status().as_u16();

        metrics.record_request(&method, &path, status, start.elapsed());
        if status >= 400 {
            metrics.record_error("http", &path);
        }

        response
    }

    /// Creates an order. The success body is an opaque acknowledgment: no
    /// order id or other internal identifiers are echoed back.
    async fn handle_create_order(
        State(state): State<AppState>,
        axum::Json(req): axum::Json<NewOrderRequest>,
    ) -> Response {
        info!("Received order request for {}", req.user.email);
        match state.orders.create_order(&req).await {
            Ok(()) => (
                StatusCode::CREATED,
                axum::Json(json!({ "Статус": "Заказ создан." })),
            )
                .into_response(),
            Err(err) => service_error_response("create_order", err),
        }
    }

    async fn handle_get_order(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
    ) -> Response {
        match state.orders.get_order(id).await {
            Ok(order) => (StatusCode::OK, axum::Json(order)).into_response(),
            Err(err) => service_error_response("get_order", err),
        }
    }

    async fn handle_pay(State(state): State<AppState>, AxumPath(id): AxumPath<i32>) -> Response {
        match state.orders.pay(id).await {
            Ok(()) => (StatusCode::OK, axum::Json(json!({ "pay_status": true }))).into_response(),
            Err(err) => service_error_response("pay", err),
        }
    }

    async fn handle_cancel(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
        axum::Json(body): axum::Json<CancelBody>,
    ) -> Response {
        match state
            .orders
            .cancel(id, body.comment_cancel.clone())
            .await
        {
            Ok(()) => (
                StatusCode::OK,
                axum::Json(json!({ "comment_cancel": body.comment_cancel })),
            )
                .into_response(),
            Err(err) => service_error_response("cancel", err),
        }
    }

    async fn handle_comment(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
        axum::Json(body): axum::Json<CommentBody>,
    ) -> Response {
        match state.orders.set_comment(id, body.comment.clone()).await {
            Ok(()) => {
                (StatusCode::OK, axum::Json(json!({ "comment": body.comment }))).into_response()
            }
            Err(err) => service_error_response("comment", err),
        }
    }

    async fn handle_reschedule(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
        axum::Json(body): axum::Json<RescheduleBody>,
    ) -> Response {
        match state
            .orders
            .reschedule(id, body.cleaning_date, body.cleaning_time)
            .await
        {
            Ok(()) => (
                StatusCode::OK,
                axum::Json(json!({
                    "cleaning_date": body.cleaning_date,
                    "cleaning_time": body.cleaning_time,
                })),
            )
                .into_response(),
            Err(err) => service_error_response("reschedule", err),
        }
    }

    async fn handle_change_status(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
        axum::Json(body): axum::Json<StatusBody>,
    ) -> Response {
        match state.orders.set_status(id, body.order_status).await {
            Ok(()) => (
                StatusCode::OK,
                axum::Json(json!({ "order_status": body.order_status })),
            )
                .into_response(),
            Err(err) => service_error_response("change_status", err),
        }
    }

    async fn handle_create_rating(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
        axum::Json(body): axum::Json<RatingBody>,
    ) -> Response {
        match state
            .ratings
            .create(id, body.user, body.text, body.score)
            .await
        {
            Ok(rating) => (StatusCode::CREATED, axum::Json(rating)).into_response(),
            Err(err) => service_error_response("create_rating", err),
        }
    }

    /// Registers a user; the success response deliberately carries no data.
    async fn handle_register(
        State(state): State<AppState>,
        axum::Json(req): axum::Json<NewUserRequest>,
    ) -> Response {
        match state.users.register(&req).await {
            Ok(()) => StatusCode::CREATED.into_response(),
            Err(err) => service_error_response("register", err),
        }
    }

    async fn handle_confirm_email(
        State(state): State<AppState>,
        axum::Json(body): axum::Json<EmailBody>,
    ) -> Response {
        match state.users.confirm_email(&body.email).await {
            Ok(()) => (
                StatusCode::OK,
                "Email has confirmed! Please check you mailbox",
            )
                .into_response(),
            Err(err) => service_error_response("confirm_email", err),
        }
    }

    async fn handle_get_user(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
    ) -> Response {
        match state.users.get_user(id).await {
            Ok(user) => (StatusCode::OK, axum::Json(user)).into_response(),
            Err(err) => service_error_response("get_user", err),
        }
    }

    async fn handle_user_orders(
        State(state): State<AppState>,
        AxumPath(id): AxumPath<i32>,
    ) -> Response {
        match state.orders.list_user_orders(id).await {
            Ok(orders) => (StatusCode::OK, axum::Json(orders)).into_response(),
            Err(err) => service_error_response("user_orders", err),
        }
    }

    async fn handle_cleaning_types(State(state): State<AppState>) -> Response {
        match state.catalog.list_cleaning_types().await {
            Ok(cleaning_types) => (StatusCode::OK, axum::Json(cleaning_types)).into_response(),
            Err(err) => service_error_response("cleaning_types", err),
        }
    }

    async fn handle_services(
        State(state): State<AppState>,
        Query(query): Query<ServicesQuery>,
    ) -> Response {
        match state.catalog.list_services(query.additional).await {
            Ok(services) => (StatusCode::OK, axum::Json(services)).into_response(),
            Err(err) => service_error_response("services", err),
        }
    }

    async fn handle_ratings(State(state): State<AppState>) -> Response {
        match state.ratings.list().await {
            Ok(ratings) => (StatusCode::OK, axum::Json(ratings)).into_response(),
            Err(err) => service_error_response("ratings", err),
        }
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<AppState>) -> Response {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
        }

        match String::from_utf8(buffer) {
            Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
            }
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use model::{CleaningType, Order, Rating, Service, User};

    struct StubOrders;

    #[async_trait]
    impl OrderService for StubOrders {
        async fn create_order(&self, _req: &NewOrderRequest) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn get_order(&self, _id: i32) -> Result<Order, ServiceError> {
            Err(ServiceError::NotFound)
        }
        async fn list_user_orders(&self, _user_id: i32) -> Result<Vec<Order>, ServiceError> {
            Ok(Vec::new())
        }
        async fn pay(&self, _id: i32) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn cancel(&self, _id: i32, _comment: Option<String>) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn set_status(&self, _id: i32, _status: OrderStatus) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn set_comment(&self, _id: i32, _comment: String) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn reschedule(
            &self,
            _id: i32,
            _date: Option<NaiveDate>,
            _time: Option<NaiveTime>,
        ) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    struct StubUsers;

    #[async_trait]
    impl UserService for StubUsers {
        async fn register(&self, _req: &NewUserRequest) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn confirm_email(&self, _email: &str) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn get_user(&self, _id: i32) -> Result<User, ServiceError> {
            Err(ServiceError::NotFound)
        }
    }

    struct StubCatalog;

    #[async_trait]
    impl CatalogService for StubCatalog {
        async fn list_cleaning_types(&self) -> Result<Vec<CleaningType>, ServiceError> {
            Ok(Vec::new())
        }
        async fn list_services(&self, _additional_only: bool) -> Result<Vec<Service>, ServiceError> {
            Ok(Vec::new())
        }
    }

    struct StubRatings;

    #[async_trait]
    impl RatingService for StubRatings {
        async fn create(
            &self,
            _order_id: i32,
            _user_id: i32,
            _text: String,
            _score: i16,
        ) -> Result<Rating, ServiceError> {
            Err(ServiceError::NotFound)
        }
        async fn list(&self) -> Result<Vec<Rating>, ServiceError> {
            Ok(Vec::new())
        }
    }

    fn create_test_server() -> Server {
        let state = AppState::new(
            Arc::new(StubOrders),
            Arc::new(StubUsers),
            Arc::new(StubCatalog),
            Arc::new(StubRatings),
        );
        Server::new("8080".to_string(), state)
    }

    #[test]
    fn test_server_creation() {
        let server = create_test_server();
        assert_eq!(server.port, "8080");
    }

    #[test]
    fn test_router_builds() {
        let server = create_test_server();
        let _router = server.create_router();
    }

    #[test]
    fn test_error_mapping() {
        let cases = [
            (
                ServiceError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::DuplicateOrder, StatusCode::BAD_REQUEST),
            (ServiceError::NotFound, StatusCode::NOT_FOUND),
            (
                ServiceError::Unexpected("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let response = service_error_response("test", err);
            assert_eq!(response.status(), expected);
        }
    }
}
