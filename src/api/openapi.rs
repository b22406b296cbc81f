//! OpenAPI document and Swagger UI for the REST surface.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{relay, system};
use crate::app_state::AppState;
use crate::domain::Subscription;
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of the relay's REST endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "station-relay",
        description = "Introspection endpoints of the device/viewer WebSocket relay."
    ),
    paths(system::health_handler, relay::list_devices, relay::list_viewers),
    components(schemas(
        system::HealthResponse,
        relay::DeviceListResponse,
        relay::ViewerListResponse,
        Subscription,
        ErrorResponse,
        ErrorBody
    ))
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON at `/api-docs/openapi.json` and the UI at
/// `/swagger-ui`.
pub fn swagger_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
