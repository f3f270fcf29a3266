use std::sync::Arc;

use poem::{
    Endpoint, EndpointExt, Route,
    middleware::{Cors, Tracing},
};
use poem_openapi::OpenApiService;

use crate::presentation::http::endpoints::{
    health::HealthEndpoints, messages::MessagesEndpoints, root::ApiState,
    scheduler::SchedulerEndpoints,
};

pub mod endpoints;
pub mod mappers;
pub mod requests;
pub mod responses;

/// Builds the HTTP application: the OpenAPI service under `/api` and the
/// Swagger UI at the root.
pub fn build_app(state: Arc<ApiState>, server_url: String) -> impl Endpoint {
    let endpoints = (
        HealthEndpoints,
        SchedulerEndpoints::new(state.clone()),
        MessagesEndpoints::new(state),
    );
    let api_service =
        OpenApiService::new(endpoints, "Message Dispatcher API", env!("CARGO_PKG_VERSION"))
            .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/api", api_service)
        .nest("/", ui)
        .with(Cors::new())
        .with(Tracing)
}
