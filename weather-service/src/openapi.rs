use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::models::{Location, WeatherKind, WeatherResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_current_weather,
        handlers::get_weather_forecast,
        handlers::list_locations,
    ),
    components(schemas(
        WeatherResponse,
        WeatherKind,
        Location,
    )),
    tags(
        (name = "weather", description = "Current weather and forecasts"),
        (name = "locations", description = "Known locations"),
    ),
)]
struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
