//! HTTP front end: turns the route table into an axum router.

pub mod handlers;
mod middleware;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    middleware::from_fn,
    routing::{MethodFilter, MethodRouter, get, on},
};
use thiserror::Error;
use tracing::debug;

use crate::{
    application::routes::{
        ABOUT_ME, CREATE_MESSAGE, DOWNLOAD_RESUME, HOME, HandlerAction, NEW_MESSAGE, RouteMethod,
        RouteTable,
    },
    config::SiteSettings,
    infra::db::PostgresRepositories,
};

use self::middleware::{log_responses, set_request_context};

pub const HEALTH_PATH: &str = "/_health/db";

#[derive(Clone)]
pub struct HttpState {
    pub routes: Arc<RouteTable>,
    pub site: Arc<SiteSettings>,
    pub db: Arc<PostgresRepositories>,
}

#[derive(Debug, Error)]
pub enum RouterBuildError {
    #[error("no handler registered for `{action}` ({method} {path})")]
    UnknownHandler {
        action: HandlerAction,
        method: RouteMethod,
        path: &'static str,
    },
}

/// Builds the method router for one action under a given method filter.
pub type HandlerFactory = fn(MethodFilter) -> MethodRouter<HttpState>;

/// Maps handler actions to the axum handlers that serve them.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerAction, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for every action in [`RouteTable::portfolio`].
    pub fn portfolio() -> Self {
        let mut registry = Self::new();
        registry.register(NEW_MESSAGE, |filter| on(filter, handlers::new_message));
        registry.register(CREATE_MESSAGE, |filter| on(filter, handlers::create_message));
        registry.register(DOWNLOAD_RESUME, |filter| {
            on(filter, handlers::download_resume)
        });
        registry.register(ABOUT_ME, |filter| on(filter, handlers::about_me));
        registry.register(HOME, |filter| on(filter, handlers::home));
        registry
    }

    pub fn register(&mut self, action: HandlerAction, factory: HandlerFactory) -> &mut Self {
        self.handlers.insert(action, factory);
        self
    }

    pub fn get(&self, action: &HandlerAction) -> Option<HandlerFactory> {
        self.handlers.get(action).copied()
    }
}

fn method_filter(method: RouteMethod) -> MethodFilter {
    match method {
        RouteMethod::Get => MethodFilter::GET,
        RouteMethod::Post => MethodFilter::POST,
    }
}

/// Register every table entry, in declaration order, and fall back to 404 for
/// anything else, including a known path requested with an undeclared method.
pub fn build_router(
    state: HttpState,
    registry: &HandlerRegistry,
) -> Result<Router, RouterBuildError> {
    let mut by_path: Vec<(&'static str, MethodRouter<HttpState>)> = Vec::new();

    for route in state.routes.iter() {
        let factory = registry
            .get(&route.handler)
            .ok_or(RouterBuildError::UnknownHandler {
                action: route.handler,
                method: route.method,
                path: route.path,
            })?;
        let endpoint = factory(method_filter(route.method));

        debug!(
            target = "portfolio::http::routes",
            method = %route.method,
            path = route.path,
            handler = %route.handler,
            name = route.name.unwrap_or(""),
            "registered route"
        );

        match by_path.iter().position(|(path, _)| *path == route.path) {
            Some(index) => {
                let (path, existing) = by_path.remove(index);
                by_path.insert(index, (path, existing.merge(endpoint)));
            }
            None => by_path.push((route.path, endpoint)),
        }
    }

    let router = by_path
        .into_iter()
        .fold(Router::new(), |router, (path, endpoint)| {
            router.route(path, endpoint.fallback(handlers::not_found))
        })
        .route(HEALTH_PATH, get(handlers::db_health))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context));

    Ok(router)
}
