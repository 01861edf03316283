mod health_check;
mod subscriptions;
mod users;

pub use health_check::*;
pub use subscriptions::*;
pub use users::*;

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

/// Prints an error followed by every error in its source chain.
pub fn error_chain_fmt(
    err: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}", err)?;
    let mut current = err.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

fn json_error_response(err: &impl ResponseError) -> HttpResponse {
    let status_code = err.status_code();
    let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
        String::from("Internal server error")
    } else {
        err.to_string()
    };

    HttpResponse::build(status_code).json(serde_json::json!({ "error": message }))
}

/// Rejects unreadable JSON bodies with the same `{"error": ...}` shape as the handlers.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _request| {
        let response =
            HttpResponse::BadRequest().json(serde_json::json!({ "error": err.to_string() }));

        InternalError::from_response(err, response).into()
    })
}
