//! The resolution pipeline: the single point where an exceptional condition
//! becomes a normal response value.
//!
//! Every entry point is total. Whatever the failure, whatever the registered
//! rules do, the caller gets back a fully-formed [`Rendered`] response; the
//! original failure never propagates past this module.

use crate::common::response::{ApiResult, Rendered};
use crate::config::{PipelineConfig, StatusMode};
use crate::context::RequestContext;
use crate::failure::Failure;
use crate::negotiate::Representation;
use crate::registry::{HandlerRegistry, Tier};
use crate::resolver::Resolver;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ResolutionPipeline {
    registry: Arc<HandlerRegistry>,
    resolver: Resolver,
    config: PipelineConfig,
}

impl ResolutionPipeline {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, PipelineConfig::default())
    }

    pub fn with_config(registry: Arc<HandlerRegistry>, config: PipelineConfig) -> Self {
        Self {
            resolver: Resolver::new(registry.clone()),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Resolve a failure into a response. Total: every failure yields
    /// exactly one rendered response.
    pub fn on_failure(&self, failure: Failure, context: &RequestContext) -> Rendered {
        if let Some((tier, rendered)) = self.resolver.resolve(&failure, context) {
            return self.finalize(tier, rendered);
        }
        let rendered = self.catch_all(&failure, context);
        self.finalize(Tier::CatchAll, rendered)
    }

    /// Uniform body for requests no handler ever ran (unroutable paths,
    /// unsupported methods). Status-aware rules get first claim, so a
    /// registered 405 special case still applies here.
    pub fn on_unroutable(&self, status: StatusCode, context: &RequestContext) -> Rendered {
        let failure = Failure::from_status(status);
        if let Some((tier, rendered)) = self.resolver.resolve(&failure, context) {
            return self.finalize(tier, rendered);
        }
        debug!(
            request_id = %context.request_id(),
            status = status.as_u16(),
            path = context.path(),
            "no status rule matched, rendering generic error"
        );
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        self.render_generic_error(status, reason, context.representation())
    }

    /// The default-error-page analogue: a uniform three-field body for a
    /// bare status/reason pair, in the requested representation.
    pub fn render_generic_error(
        &self,
        status: StatusCode,
        reason: &str,
        representation: Representation,
    ) -> Rendered {
        let rendered = Rendered::envelope(ApiResult::of(i32::from(status.as_u16()), reason))
            .with_representation(representation);
        self.finalize(Tier::CatchAll, rendered)
    }

    /// Last-registered catch-all rule, demoted to the built-in rendering if
    /// it bails out or fails. Rendering failures cannot recurse: the
    /// built-in path is pure construction.
    fn catch_all(&self, failure: &Failure, context: &RequestContext) -> Rendered {
        if let Some(rule) = self.registry.rules_in_tier(Tier::CatchAll).last() {
            match rule.invoke(failure, context) {
                Ok(Some(rendered)) => return rendered,
                Ok(None) => warn!(
                    request_id = %context.request_id(),
                    failure = %failure,
                    "catch-all rule produced no response, using default rendering"
                ),
                Err(error) => warn!(
                    request_id = %context.request_id(),
                    failure = %failure,
                    %error,
                    "catch-all rule failed, using default rendering"
                ),
            }
        }
        self.default_rendering(failure, context)
    }

    fn default_rendering(&self, failure: &Failure, context: &RequestContext) -> Rendered {
        let message = failure
            .message()
            .map(str::to_owned)
            .unwrap_or_else(|| failure.type_name().to_owned());
        Rendered::envelope(ApiResult::of(self.config.default_code, message))
            .with_representation(context.representation())
    }

    /// Apply the tier's status convention to the finished response.
    fn finalize(&self, tier: Tier, rendered: Rendered) -> Rendered {
        match self.config.mode_for(tier) {
            StatusMode::Embedded => rendered,
            StatusMode::Real => {
                let real = u16::try_from(rendered.result().code)
                    .ok()
                    .and_then(|code| StatusCode::from_u16(code).ok());
                match real {
                    Some(status) => rendered.with_status(status),
                    None => rendered,
                }
            }
        }
    }
}
