//! Transport-boundary adapter: a tower layer that feeds every failure into
//! the resolution pipeline.
//!
//! Two paths converge here: inner-service errors become [`Failure`]s and go
//! through `on_failure`, and bare error-status responses nothing rendered a
//! body for (router fallbacks like 404/405) are rewritten through
//! `on_unroutable`. Either way the client sees a structured body, never a
//! framework-default error page.

use crate::context::RequestContext;
use crate::failure::Failure;
use crate::pipeline::ResolutionPipeline;
use axum::{
    body::Body,
    http::{Request, header},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

#[derive(Clone)]
pub struct FaultLayer {
    pipeline: Arc<ResolutionPipeline>,
}

impl FaultLayer {
    pub fn new(pipeline: Arc<ResolutionPipeline>) -> Self {
        Self { pipeline }
    }
}

impl<S> Layer<S> for FaultLayer {
    type Service = FaultMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FaultMiddleware {
            inner,
            pipeline: self.pipeline.clone(),
        }
    }
}

#[derive(Clone)]
pub struct FaultMiddleware<S> {
    inner: S,
    pipeline: Arc<ResolutionPipeline>,
}

impl<S> Service<Request<Body>> for FaultMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        // readiness is driven inside the future via oneshot on a clone
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let pipeline = self.pipeline.clone();
        let inner = self.inner.clone();
        // capture path and accept signal before the request is consumed
        let context = RequestContext::from_request(&request);

        Box::pin(async move {
            match inner.oneshot(request).await {
                Ok(response) => Ok(finish(&pipeline, &context, response)),
                Err(error) => {
                    let failure = Failure::from(error.into());
                    Ok(pipeline.on_failure(failure, &context).into_response())
                }
            }
        })
    }
}

/// Rewrite bare error-status responses. A missing `Content-Type` on a
/// 4xx/5xx means no handler or rule rendered a body for it.
fn finish(
    pipeline: &ResolutionPipeline,
    context: &RequestContext,
    response: Response,
) -> Response {
    let status = response.status();
    let bare = (status.is_client_error() || status.is_server_error())
        && !response.headers().contains_key(header::CONTENT_TYPE);
    if bare {
        return pipeline.on_unroutable(status, context).into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::response::{ApiResult, Rendered};
    use crate::registry::{HandlerRegistry, Rule};
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::error::Error as StdError;
    use std::fmt;
    use tower::service_fn;

    #[derive(Debug)]
    struct HandlerFault;

    impl fmt::Display for HandlerFault {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("handler blew up")
        }
    }

    impl StdError for HandlerFault {}

    fn pipeline() -> Arc<ResolutionPipeline> {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(Rule::status(
            StatusCode::METHOD_NOT_ALLOWED,
            |_, context| {
                Ok(Some(Rendered::envelope(ApiResult::of(
                    405,
                    format!("{} 请求方式不正确", context.path()),
                ))))
            },
        ));
        Arc::new(ResolutionPipeline::new(registry))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_inner_service_error_becomes_envelope() {
        let failing = service_fn(|_request: Request<Body>| async {
            Err::<Response, Box<dyn StdError + Send + Sync>>(Box::new(HandlerFault))
        });
        let mut service = FaultLayer::new(pipeline()).layer(failing);

        let request = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let response = service.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "handler blew up");
        assert_eq!(body["data"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_bare_method_not_allowed_is_rewritten() {
        async fn hello() -> &'static str {
            "hello"
        }
        let app = Router::new()
            .route("/hello", post(hello))
            .layer(FaultLayer::new(pipeline()));

        let request = Request::builder()
            .method("GET")
            .uri("/hello")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["code"], 405);
        assert_eq!(body["message"], "/hello 请求方式不正确");
    }

    #[tokio::test]
    async fn test_bare_not_found_gets_generic_body() {
        let app = Router::new().layer(FaultLayer::new(pipeline()));

        let request = Request::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["code"], 404);
        assert_eq!(body["message"], "Not Found");
    }

    #[tokio::test]
    async fn test_rendered_responses_pass_through_untouched() {
        async fn reject() -> Response {
            (StatusCode::CONFLICT, axum::Json(serde_json::json!({"reason": "dup"})))
                .into_response()
        }
        let app = Router::new()
            .route("/submit", post(reject))
            .layer(FaultLayer::new(pipeline()));

        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        // the handler rendered its own body, the layer must not rewrite it
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["reason"], "dup");
    }

    #[tokio::test]
    async fn test_composes_under_other_middleware() {
        let app = Router::new()
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .layer(FaultLayer::new(pipeline()));

        let request = Request::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_xml_accept_negotiates_xml_error_page() {
        let app = Router::new().layer(FaultLayer::new(pipeline()));

        let request = Request::builder()
            .uri("/missing")
            .header(header::ACCEPT, "application/xml")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("<code>404</code>"));
        assert!(body.contains("<message>Not Found</message>"));
    }
}
