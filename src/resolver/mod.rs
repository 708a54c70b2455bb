//! Rule selection: given a failure, pick exactly one tier-1 or tier-2 rule
//! and invoke it. The catch-all tier belongs to the pipeline; a `None` from
//! here means "fall through".

use crate::common::response::Rendered;
use crate::context::RequestContext;
use crate::failure::Failure;
use crate::registry::{HandlerRegistry, Rule, Tier};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Resolver {
    registry: Arc<HandlerRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Select the best tier-1/tier-2 rule and invoke it.
    ///
    /// Returns the producing tier alongside the response so the caller can
    /// apply per-tier status conventions. A selected rule that bails out or
    /// fails is logged and treated exactly like "no match": the failure
    /// escalates to the catch-all tier.
    pub fn resolve(
        &self,
        failure: &Failure,
        context: &RequestContext,
    ) -> Option<(Tier, Rendered)> {
        let rule = self.select(failure)?;
        match rule.invoke(failure, context) {
            Ok(Some(rendered)) => {
                debug!(
                    request_id = %context.request_id(),
                    tier = %rule.tier(),
                    rule = %rule.describe(),
                    path = context.path(),
                    "failure resolved"
                );
                Some((rule.tier(), rendered))
            }
            Ok(None) => {
                warn!(
                    request_id = %context.request_id(),
                    rule = %rule.describe(),
                    failure = %failure,
                    "rule produced no response, escalating to catch-all"
                );
                None
            }
            Err(error) => {
                warn!(
                    request_id = %context.request_id(),
                    rule = %rule.describe(),
                    failure = %failure,
                    %error,
                    "rule failed while rendering, escalating to catch-all"
                );
                None
            }
        }
    }

    /// Pick the single best rule across tiers 1 and 2 without invoking it.
    pub fn select(&self, failure: &Failure) -> Option<Arc<Rule>> {
        self.select_typed(failure)
            .or_else(|| self.select_status(failure))
    }

    /// Walk the failure's ancestry chain, nearest type first. The first
    /// chain entry claimed by any rule wins, so a runtime-type match always
    /// beats an ancestor match; within one chain depth the most recently
    /// registered rule wins.
    fn select_typed(&self, failure: &Failure) -> Option<Arc<Rule>> {
        let rules = self.registry.rules_in_tier(Tier::Typed);
        if rules.is_empty() {
            return None;
        }
        for kind in self.registry.ancestry_chain(failure.kind()) {
            if let Some(rule) = rules.iter().rev().find(|rule| rule.matches_type(kind)) {
                return Some(rule.clone());
            }
        }
        None
    }

    /// Only consulted when the transport attached a status and no typed rule
    /// matched. Exact-status rules beat any-status rules regardless of
    /// registration order.
    fn select_status(&self, failure: &Failure) -> Option<Arc<Rule>> {
        let status = failure.status()?;
        let rules = self.registry.rules_in_tier(Tier::StatusAware);
        rules
            .iter()
            .rev()
            .find(|rule| rule.matches_status(status))
            .or_else(|| rules.iter().rev().find(|rule| rule.matches_any_status()))
            .cloned()
    }
}
