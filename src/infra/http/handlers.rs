//! Placeholder request handlers for the site's routes.

use std::io::ErrorKind;

use axum::{
    Form,
    extract::State,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use metrics::counter;
use serde::Deserialize;
use tracing::info;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::routes::RouteMethod;
use crate::presentation::views::{AboutTemplate, ContactTemplate, HomeTemplate, render_template};

use super::HttpState;

const ABOUT_PATH: &str = "/about-me";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub body: String,
}

pub async fn home(State(state): State<HttpState>) -> Result<Html<String>, HttpError> {
    render_template(HomeTemplate {
        site_title: &state.site.title,
        about_path: state
            .routes
            .resolve(RouteMethod::Get, ABOUT_PATH)
            .map_or("/", |route| route.path),
        resume_path: state.routes.path_for("download_resume").unwrap_or("/"),
        contact_path: state.routes.path_for("new_message").unwrap_or("/"),
    })
}

pub async fn about_me(State(state): State<HttpState>) -> Result<Html<String>, HttpError> {
    render_template(AboutTemplate {
        site_title: &state.site.title,
    })
}

pub async fn new_message(State(state): State<HttpState>) -> Result<Html<String>, HttpError> {
    render_template(ContactTemplate {
        site_title: &state.site.title,
        action: state.routes.path_for("create_message").unwrap_or("/"),
    })
}

pub async fn create_message(
    State(state): State<HttpState>,
    Form(form): Form<ContactForm>,
) -> Redirect {
    info!(
        target = "portfolio::http::messages",
        email = %form.email,
        name = %form.name,
        body_len = form.body.len(),
        "contact message received"
    );
    Redirect::to(state.routes.path_for("new_message").unwrap_or("/"))
}

pub async fn download_resume(State(state): State<HttpState>) -> Result<Response, HttpError> {
    const SOURCE: &str = "infra::http::handlers::download_resume";

    let path = state.site.resume_path.as_path();
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            HttpError::not_found(SOURCE, format!("resume missing at {}", path.display()))
        } else {
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            )
        }
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.site.resume_filename.replace('"', "")
    );
    let disposition = HeaderValue::from_str(&disposition).map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
    })?;

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}

pub async fn db_health(State(state): State<HttpState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::handlers::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub async fn not_found() -> HttpError {
    counter!("portfolio_http_unmatched_total").increment(1);
    HttpError::not_found("infra::http::handlers::not_found", "no route matched")
}
