use std::sync::Arc;

use poem_openapi::{OpenApi, payload::Json};

use crate::{
    application::scheduler::{StartOutcome, StopOutcome},
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        responses::{ActionResponseDto, SchedulerStatusDto, SchedulerStatusResponseDto},
    },
};

#[derive(Clone)]
pub struct SchedulerEndpoints {
    state: Arc<ApiState>,
}

impl SchedulerEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl SchedulerEndpoints {
    /// Start the dispatch loop. Starting a running scheduler is a no-op.
    #[oai(
        path = "/scheduler/start",
        method = "post",
        tag = EndpointsTags::Scheduler,
    )]
    pub async fn start(&self) -> Json<ActionResponseDto> {
        let message = match self.state.scheduler.start() {
            StartOutcome::Started => "Scheduler started successfully",
            StartOutcome::AlreadyRunning => "Scheduler is already running",
        };
        Json(ActionResponseDto::ok(message))
    }

    /// Stop the dispatch loop and wait for the in-flight cycle to unwind.
    #[oai(
        path = "/scheduler/stop",
        method = "post",
        tag = EndpointsTags::Scheduler,
    )]
    pub async fn stop(&self) -> Json<ActionResponseDto> {
        let message = match self.state.scheduler.stop().await {
            StopOutcome::Stopped => "Scheduler stopped successfully",
            StopOutcome::NotRunning => "Scheduler is not running",
        };
        Json(ActionResponseDto::ok(message))
    }

    #[oai(
        path = "/scheduler/status",
        method = "get",
        tag = EndpointsTags::Scheduler,
    )]
    pub async fn status(&self) -> Json<SchedulerStatusResponseDto> {
        let running = self.state.scheduler.is_running();
        Json(SchedulerStatusResponseDto {
            success: true,
            message: "Scheduler status retrieved successfully".to_string(),
            data: SchedulerStatusDto {
                status: running.into(),
                running,
            },
        })
    }
}
