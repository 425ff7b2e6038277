use std::sync::Arc;

use axum::{extract::Request, middleware, routing::get, Router};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::expose_error_details;
use crate::handlers;
use crate::ids::IdGenerator;
use crate::interest::InterestBook;
use crate::ledger::Ledger;
use crate::lst::LstDesk;
use crate::oneinch::OneInchClient;
use crate::prime::PrimeDesk;
use crate::scheduler::ScheduleBook;
use crate::users::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub oneinch: Arc<OneInchClient>,
    pub ledger: Arc<Ledger>,
    pub interest: Arc<InterestBook>,
    pub lst: Arc<LstDesk>,
    pub schedules: Arc<ScheduleBook>,
    pub prime: Arc<PrimeDesk>,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    /// Wires every service from `config`. Demo fixtures are loaded when
    /// `seed_demo_data` is set.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let oneinch = Arc::new(OneInchClient::from_config(&config)?);
        let ids = IdGenerator::new();
        let ledger = Ledger::in_memory();
        let registry = ledger.registry().clone();

        let state = Self {
            interest: Arc::new(InterestBook::new(Arc::clone(&oneinch))),
            lst: Arc::new(LstDesk::new(Arc::clone(&oneinch))),
            schedules: Arc::new(ScheduleBook::new(ids.clone())),
            prime: Arc::new(PrimeDesk::new(Arc::clone(&oneinch), ids, registry)),
            users: Arc::new(UserDirectory::new()),
            ledger: Arc::new(ledger),
            oneinch,
            config: Arc::new(config),
        };

        if state.config.seed_demo_data {
            state.seed_demo_data().await;
        }
        Ok(state)
    }

    async fn seed_demo_data(&self) {
        let now = Utc::now();
        self.interest.seed_demo(now).await;
        self.lst.seed_demo(now).await;
        self.schedules.seed_demo(now).await;
        self.users.seed_demo().await;
        tracing::info!("demo fixtures loaded");
    }
}

pub fn create_app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id,
        )
    });

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", handlers::api_routes())
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            expose_error_details,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
