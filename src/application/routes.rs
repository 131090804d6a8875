//! The site's route table: which (method, path) pair maps to which handler action.
//!
//! The table is assembled once at startup and shared read-only afterwards.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// HTTP methods the table can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl Display for RouteMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler action identified by `resource#action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerAction {
    pub resource: &'static str,
    pub action: &'static str,
}

impl HandlerAction {
    pub const fn new(resource: &'static str, action: &'static str) -> Self {
        Self { resource, action }
    }
}

impl Display for HandlerAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.resource, self.action)
    }
}

impl Serialize for HandlerAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub method: RouteMethod,
    pub path: &'static str,
    pub handler: HandlerAction,
    pub name: Option<&'static str>,
}

impl Route {
    pub const fn get(path: &'static str, handler: HandlerAction) -> Self {
        Self {
            method: RouteMethod::Get,
            path,
            handler,
            name: None,
        }
    }

    pub const fn post(path: &'static str, handler: HandlerAction) -> Self {
        Self {
            method: RouteMethod::Post,
            path,
            handler,
            name: None,
        }
    }

    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("route `{method} {path}` is declared more than once")]
    Duplicate {
        method: RouteMethod,
        path: &'static str,
    },
    #[error("route name `{name}` is declared more than once")]
    DuplicateName { name: &'static str },
}

pub const NEW_MESSAGE: HandlerAction = HandlerAction::new("messages", "new");
pub const CREATE_MESSAGE: HandlerAction = HandlerAction::new("messages", "create");
pub const DOWNLOAD_RESUME: HandlerAction = HandlerAction::new("welcome", "download_resume");
pub const ABOUT_ME: HandlerAction = HandlerAction::new("pages", "about_me");
pub const HOME: HandlerAction = HandlerAction::new("pages", "home");

/// Immutable, ordered route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table, rejecting repeated (method, path) pairs and repeated names.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteTableError> {
        let mut seen = HashSet::with_capacity(routes.len());
        let mut names = HashSet::new();
        for route in &routes {
            if !seen.insert((route.method, route.path)) {
                return Err(RouteTableError::Duplicate {
                    method: route.method,
                    path: route.path,
                });
            }
            if let Some(name) = route.name
                && !names.insert(name)
            {
                return Err(RouteTableError::DuplicateName { name });
            }
        }
        Ok(Self { routes })
    }

    /// The portfolio site's routes, in declaration order.
    pub fn portfolio() -> Self {
        Self {
            routes: vec![
                Route::get("/contact-me", NEW_MESSAGE).named("new_message"),
                Route::post("/contact-me", CREATE_MESSAGE).named("create_message"),
                Route::get("/resume-download", DOWNLOAD_RESUME).named("download_resume"),
                Route::get("/about-me", ABOUT_ME),
                Route::get("/", HOME).named("root"),
            ],
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Exact (method, path) match.
    pub fn resolve(&self, method: RouteMethod, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.method == method && route.path == path)
    }

    /// Reverse lookup of a route's path by name.
    pub fn path_for(&self, name: &str) -> Option<&'static str> {
        self.routes
            .iter()
            .find(|route| route.name == Some(name))
            .map(|route| route.path)
    }

    /// Column-aligned listing: name, method, path, handler.
    pub fn render_listing(&self) -> String {
        let name_width = self
            .routes
            .iter()
            .map(|route| route.name.map_or(0, str::len))
            .max()
            .unwrap_or(0);
        let path_width = self
            .routes
            .iter()
            .map(|route| route.path.len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for route in &self.routes {
            let line = format!(
                "{:>name_width$} {:<4} {:<path_width$} {}",
                route.name.unwrap_or(""),
                route.method.as_str(),
                route.path,
                route.handler,
            );
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portfolio_table_passes_construction_checks() {
        let table = RouteTable::portfolio();
        let rebuilt = RouteTable::new(table.routes().to_vec()).expect("unique routes");
        assert_eq!(rebuilt.len(), 5);
    }

    #[test]
    fn every_declared_route_resolves_to_its_handler() {
        let table = RouteTable::portfolio();
        let expected = [
            (RouteMethod::Get, "/contact-me", "messages#new"),
            (RouteMethod::Post, "/contact-me", "messages#create"),
            (RouteMethod::Get, "/resume-download", "welcome#download_resume"),
            (RouteMethod::Get, "/about-me", "pages#about_me"),
            (RouteMethod::Get, "/", "pages#home"),
        ];
        for (method, path, handler) in expected {
            let route = table.resolve(method, path).expect("route declared");
            assert_eq!(route.handler.to_string(), handler);
        }
    }

    #[test]
    fn undeclared_pairs_do_not_resolve() {
        let table = RouteTable::portfolio();
        assert!(table.resolve(RouteMethod::Post, "/about-me").is_none());
        assert!(table.resolve(RouteMethod::Post, "/").is_none());
        assert!(table.resolve(RouteMethod::Get, "/contact-me/").is_none());
        assert!(table.resolve(RouteMethod::Get, "/resume").is_none());
        assert!(table.resolve(RouteMethod::Get, "/About-Me").is_none());
    }

    #[test]
    fn named_routes_reverse_to_literal_paths() {
        let table = RouteTable::portfolio();
        assert_eq!(table.path_for("new_message"), Some("/contact-me"));
        assert_eq!(table.path_for("create_message"), Some("/contact-me"));
        assert_eq!(table.path_for("download_resume"), Some("/resume-download"));
        assert_eq!(table.path_for("root"), Some("/"));
        assert_eq!(table.path_for("about_me"), None);
    }

    #[test]
    fn about_page_is_unnamed() {
        let table = RouteTable::portfolio();
        let route = table.resolve(RouteMethod::Get, "/about-me").unwrap();
        assert_eq!(route.name, None);
    }

    #[test]
    fn duplicate_method_and_path_is_rejected() {
        let err = RouteTable::new(vec![
            Route::get("/", HOME),
            Route::get("/", ABOUT_ME),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RouteTableError::Duplicate {
                method: RouteMethod::Get,
                path: "/"
            }
        );
    }

    #[test]
    fn same_path_with_different_methods_is_allowed() {
        RouteTable::new(vec![
            Route::get("/contact-me", NEW_MESSAGE),
            Route::post("/contact-me", CREATE_MESSAGE),
        ])
        .expect("distinct methods");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = RouteTable::new(vec![
            Route::get("/a", HOME).named("page"),
            Route::get("/b", ABOUT_ME).named("page"),
        ])
        .unwrap_err();
        assert_eq!(err, RouteTableError::DuplicateName { name: "page" });
    }

    #[test]
    fn listing_matches_declaration_order() {
        insta::assert_snapshot!(RouteTable::portfolio().render_listing(), @r"
            new_message GET  /contact-me      messages#new
         create_message POST /contact-me      messages#create
        download_resume GET  /resume-download welcome#download_resume
                        GET  /about-me        pages#about_me
                   root GET  /                pages#home
        ");
    }

    #[test]
    fn json_listing_uses_uppercase_methods_and_action_strings() {
        let json = serde_json::to_string_pretty(RouteTable::portfolio().routes()).expect("encode");
        insta::assert_snapshot!(json, @r#"
        [
          {
            "method": "GET",
            "path": "/contact-me",
            "handler": "messages#new",
            "name": "new_message"
          },
          {
            "method": "POST",
            "path": "/contact-me",
            "handler": "messages#create",
            "name": "create_message"
          },
          {
            "method": "GET",
            "path": "/resume-download",
            "handler": "welcome#download_resume",
            "name": "download_resume"
          },
          {
            "method": "GET",
            "path": "/about-me",
            "handler": "pages#about_me",
            "name": null
          },
          {
            "method": "GET",
            "path": "/",
            "handler": "pages#home",
            "name": "root"
          }
        ]
        "#);
    }
}
