//! Route registration from endpoint descriptors.
//!
//! Services describe their HTTP surface as a list of [`Endpoint`]
//! descriptors plus a [`HandlerMap`] keyed by method name.
//! [`register`] walks the descriptors, resolves each one against the
//! map, and mounts the result on an [`axum::Router`]. Resolution
//! failures (malformed names, unknown HTTP verbs, missing handlers)
//! abort registration so a service never starts with a partial surface.

use axum::handler::Handler;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use std::collections::HashMap;
use thiserror::Error;

/// Declarative description of a single route.
///
/// `name` follows the `Service.Method` convention; the part after the
/// first dot selects the handler from the [`HandlerMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub path: String,
    pub methods: Vec<String>,
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        methods: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// The handler key, i.e. everything after the first dot.
    fn method_name(&self) -> Result<&str, RegisterError> {
        match self.name.split_once('.') {
            Some((service, method)) if !service.is_empty() && !method.is_empty() => Ok(method),
            _ => Err(RegisterError::InvalidName(self.name.clone())),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("endpoint name {0:?} is not of the form Service.Method")]
    InvalidName(String),
    #[error("unknown http method {0:?}")]
    UnknownMethod(String),
    #[error("endpoint {0:?} declares no http methods")]
    NoMethods(String),
    #[error("no handler registered for {0:?}")]
    MissingHandler(String),
}

type HandlerFactory = Box<dyn FnOnce(MethodFilter) -> MethodRouter + Send>;

/// Named handlers waiting to be bound to endpoint descriptors.
#[derive(Default)]
pub struct HandlerMap {
    handlers: HashMap<String, HandlerFactory>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`; any `axum` handler fits.
    pub fn insert<H, T>(&mut self, name: impl Into<String>, handler: H)
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.handlers
            .insert(name.into(), Box::new(move |filter| on(filter, handler)));
    }

    fn take(&mut self, name: &str) -> Option<HandlerFactory> {
        self.handlers.remove(name)
    }
}

/// Mount every endpoint on `router`, resolving handlers by name.
pub fn register(
    mut router: Router,
    endpoints: &[Endpoint],
    mut handlers: HandlerMap,
) -> Result<Router, RegisterError> {
    for endpoint in endpoints {
        let method_name = endpoint.method_name()?;
        let filter = method_filter(endpoint)?;
        let factory = handlers
            .take(method_name)
            .ok_or_else(|| RegisterError::MissingHandler(endpoint.name.clone()))?;
        router = router.route(&endpoint.path, factory(filter));
    }
    Ok(router)
}

fn method_filter(endpoint: &Endpoint) -> Result<MethodFilter, RegisterError> {
    let mut combined: Option<MethodFilter> = None;
    for method in &endpoint.methods {
        let filter = match method.to_ascii_uppercase().as_str() {
            "GET" => MethodFilter::GET,
            "POST" => MethodFilter::POST,
            "PUT" => MethodFilter::PUT,
            "DELETE" => MethodFilter::DELETE,
            "PATCH" => MethodFilter::PATCH,
            "HEAD" => MethodFilter::HEAD,
            "OPTIONS" => MethodFilter::OPTIONS,
            "TRACE" => MethodFilter::TRACE,
            _ => return Err(RegisterError::UnknownMethod(method.clone())),
        };
        combined = Some(match combined {
            Some(existing) => existing.or(filter),
            None => filter,
        });
    }
    combined.ok_or_else(|| RegisterError::NoMethods(endpoint.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn status() -> &'static str {
        "ok"
    }

    async fn create() -> StatusCode {
        StatusCode::CREATED
    }

    fn handlers() -> HandlerMap {
        let mut map = HandlerMap::new();
        map.insert("Status", status);
        map.insert("Create", create);
        map
    }

    #[tokio::test]
    async fn test_register_mounts_endpoints() {
        let endpoints = vec![
            Endpoint::new("Orders.Status", "/status", &["GET"]),
            Endpoint::new("Orders.Create", "/orders", &["POST", "PUT"]),
        ];
        let router = register(Router::new(), &endpoints, handlers()).unwrap();

        let rsp = router
            .clone()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(rsp.status(), StatusCode::OK);

        let rsp = router
            .clone()
            .oneshot(Request::put("/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(rsp.status(), StatusCode::CREATED);

        // DELETE was not declared for /orders.
        let rsp = router
            .oneshot(Request::delete("/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(rsp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_name() {
        let endpoints = vec![Endpoint::new("Status", "/status", &["GET"])];
        let err = register(Router::new(), &endpoints, handlers()).unwrap_err();
        assert!(matches!(err, RegisterError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_http_method() {
        let endpoints = vec![Endpoint::new("Orders.Status", "/status", &["FETCH"])];
        let err = register(Router::new(), &endpoints, handlers()).unwrap_err();
        assert!(matches!(err, RegisterError::UnknownMethod(m) if m == "FETCH"));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_method_list() {
        let endpoints = vec![Endpoint::new("Orders.Status", "/status", &[])];
        let err = register(Router::new(), &endpoints, handlers()).unwrap_err();
        assert!(matches!(err, RegisterError::NoMethods(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_missing_handler() {
        let endpoints = vec![Endpoint::new("Orders.Delete", "/orders", &["DELETE"])];
        let err = register(Router::new(), &endpoints, handlers()).unwrap_err();
        assert!(matches!(err, RegisterError::MissingHandler(n) if n == "Orders.Delete"));
    }
}
