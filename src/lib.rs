//! # Faultline
//!
//! A structured failure-resolution layer for axum services.
//!
//! Faultline sits between your handlers and the transport layer and turns
//! every failure raised while processing a request into a well-formed,
//! client-consumable response. A raw crash or a framework-default error page
//! never reaches the client: whatever went wrong, the caller receives the
//! same three-field body (`code`, `message`, `data`) in the representation
//! it asked for.
//!
//! ## Features
//!
//! - **Tiered resolution**: typed rules, status-aware rules, and a
//!   guaranteed catch-all, consulted in fixed precedence order
//! - **Specificity dispatch**: rules bound to a failure type also claim its
//!   registered subtypes; the closest type wins, later registrations break
//!   ties
//! - **Content negotiation**: JSON by default, XML opt-in, for the generic
//!   error path
//! - **Total by construction**: every failure yields exactly one response,
//!   even when rules themselves bail out or fail
//! - **Boundary layer**: a tower middleware that catches service errors and
//!   rewrites bare router fallbacks (404/405) into uniform bodies
//!
//! ## Quick Start
//!
//! ```rust
//! use faultline::prelude::*;
//! use std::fmt;
//! use std::sync::Arc;
//!
//! // 1. Define a failure type
//! #[derive(Debug)]
//! struct OutOfStock;
//!
//! impl fmt::Display for OutOfStock {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str("item out of stock")
//!     }
//! }
//!
//! impl std::error::Error for OutOfStock {}
//!
//! // 2. Register rules once at startup
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register(Rule::typed::<OutOfStock, _>(|failure, _| {
//!     Ok(Some(Rendered::envelope(ApiResult::of(
//!         400,
//!         failure.message().unwrap_or_default(),
//!     ))))
//! }));
//! registry.register(Rule::catch_all(|failure, context| {
//!     let message = failure
//!         .message()
//!         .map(str::to_owned)
//!         .unwrap_or_else(|| failure.type_name().to_owned());
//!     Ok(Some(
//!         Rendered::envelope(ApiResult::of(400, message))
//!             .with_representation(context.representation()),
//!     ))
//! }));
//!
//! // 3. Resolve failures through the pipeline
//! let pipeline = ResolutionPipeline::new(registry);
//! let rendered = pipeline.on_failure(
//!     Failure::from_error(OutOfStock),
//!     &RequestContext::new("/cart"),
//! );
//! assert_eq!(
//!     rendered.body(),
//!     r#"{"code":400,"message":"item out of stock","data":null}"#
//! );
//! ```
//!
//! To wire the pipeline into an axum app, wrap the router in
//! [`FaultLayer`](layer::FaultLayer):
//!
//! ```rust,no_run
//! use axum::Router;
//! use faultline::layer::FaultLayer;
//! use faultline::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(HandlerRegistry::new());
//! let pipeline = Arc::new(ResolutionPipeline::new(registry));
//! let app: Router = Router::new().layer(FaultLayer::new(pipeline));
//! ```

pub mod common;
pub mod config;
pub mod context;
pub mod error;
pub mod failure;
pub mod layer;
pub mod negotiate;
pub mod pipeline;
pub mod registry;
pub mod resolver;

// Re-export core types
pub use common::{ApiResult, Rendered};
pub use config::{PipelineConfig, StatusMode};
pub use context::RequestContext;
pub use error::{FaultlineError, Result};
pub use failure::Failure;
pub use negotiate::Representation;
pub use pipeline::ResolutionPipeline;
pub use registry::{HandlerRegistry, Rule, RuleError, RuleResult, Tier};

// Re-export commonly used types from dependencies
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use faultline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::common::{ApiResult, Rendered};
    pub use crate::config::{PipelineConfig, StatusMode};
    pub use crate::context::RequestContext;
    pub use crate::error::{FaultlineError, Result};
    pub use crate::failure::{Failure, OpaqueFailure};
    pub use crate::layer::{FaultLayer, FaultMiddleware};
    pub use crate::negotiate::Representation;
    pub use crate::pipeline::ResolutionPipeline;
    pub use crate::registry::{HandlerRegistry, Rule, RuleError, RuleResult, Tier};
    pub use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    };
}
