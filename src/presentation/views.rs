use askama::{Error as AskamaError, Template};
use axum::{http::StatusCode, response::Html};
use thiserror::Error;

use crate::application::error::HttpError;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        HttpError::from_error(
            err.source,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.public_message,
            &err.error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|error| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error,
        }
        .into()
    })
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub site_title: &'a str,
    pub about_path: &'a str,
    pub resume_path: &'a str,
    pub contact_path: &'a str,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate<'a> {
    pub site_title: &'a str,
}

/// Contact form; `action` is where the form posts.
#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate<'a> {
    pub site_title: &'a str,
    pub action: &'a str,
}
