use crate::server::api;
use crate::server::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

/// Routes one `/api` request. Synchronous: callers run it off the async
/// runtime since calculations can take a while.
pub fn route_request(state: &AppState, method: &str, path: &str, body: &str) -> HttpResponse {
    let route = path.split('?').next().unwrap_or(path);
    match (method, route) {
        ("GET", "/api/health") => match api::health_payload(state) {
            Ok(payload) => HttpResponse {
                status_code: 200,
                status_text: "OK",
                content_type: "application/json",
                body: payload,
            },
            Err(err) => error_response(500, "Internal Server Error", &err.to_string()),
        },
        ("GET", "/api/tables") => calculation_response(200, "OK", api::tables_payload(path)),
        ("POST", "/api/calculate") => {
            calculation_response(200, "OK", api::calculate_payload(state, body))
        }
        ("POST", "/api/potential") => {
            calculation_response(200, "OK", api::potential_payload(state, body))
        }
        ("POST", "/api/batch") => calculation_response(200, "OK", api::batch_payload(state, body)),
        ("POST", "/api/jobs") => {
            calculation_response(202, "Accepted", api::job_submit_payload(state, body))
        }
        ("GET", route) if route.starts_with("/api/jobs/") => {
            let id = route.trim_start_matches("/api/jobs/");
            match api::job_get_payload(state, id) {
                Ok(payload) => HttpResponse {
                    status_code: 200,
                    status_text: "OK",
                    content_type: "application/json",
                    body: payload,
                },
                Err(err @ api::JobLookupError::InvalidId(_)) => {
                    error_response(400, "Bad Request", &err.to_string())
                }
                Err(api::JobLookupError::NotFound) => {
                    error_response(404, "Not Found", "Job not found")
                }
                Err(api::JobLookupError::Serialize(err)) => {
                    error_response(500, "Internal Server Error", &err.to_string())
                }
            }
        }
        _ => error_response(404, "Not Found", "Route not found"),
    }
}

fn calculation_response(
    status_code: u16,
    status_text: &'static str,
    result: Result<String, api::CalculationPayloadError>,
) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse {
            status_code,
            status_text,
            content_type: "application/json",
            body: payload,
        },
        Err(api::CalculationPayloadError::Parse(err)) => {
            error_response(400, "Bad Request", &format!("Invalid request body: {err}"))
        }
        Err(api::CalculationPayloadError::Validation(validation)) => {
            validation_error_response(400, "Bad Request", validation)
        }
        Err(api::CalculationPayloadError::Unavailable(message)) => {
            error_response(503, "Service Unavailable", &message)
        }
        Err(api::CalculationPayloadError::Internal(message)) => {
            error_response(500, "Internal Server Error", &message)
        }
    }
}

fn validation_error_response(
    status_code: u16,
    status_text: &'static str,
    payload: api::ValidationErrorResponse,
) -> HttpResponse {
    let fallback =
        "{\n  \"status\": \"error\",\n  \"message\": \"Validation failed\"\n}".to_string();

    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: serde_json::to_string_pretty(&payload).unwrap_or(fallback),
    }
}

pub(crate) fn error_response(
    status_code: u16,
    status_text: &'static str,
    message: &str,
) -> HttpResponse {
    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}
