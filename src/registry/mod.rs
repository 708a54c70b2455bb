//! The handler registry: every resolution rule the process knows about,
//! bucketed by precedence tier, plus the failure-type ancestry table the
//! specificity walk runs on.
//!
//! The registry is populated once during startup and only read afterwards,
//! so unsynchronized concurrent reads are safe.

use crate::common::response::Rendered;
use crate::context::RequestContext;
use crate::error::{FaultlineError, Result};
use crate::failure::Failure;
use axum::http::StatusCode;
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use strum_macros::Display;
use thiserror::Error;

/// Precedence bucket, consulted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Tier {
    /// Rules bound to exact failure types (and, via the ancestry table,
    /// their subtypes).
    Typed,
    /// Rules that react to a transport-assigned HTTP status.
    StatusAware,
    /// The always-matching backstop.
    CatchAll,
}

/// What a rule's `produce` function may return.
///
/// `Ok(None)` is the defensive bail-out: the rule looked at the failure and
/// declined to render. `Err` means the rule itself failed while rendering.
/// Both escalate to the catch-all tier.
pub type RuleResult = std::result::Result<Option<Rendered>, RuleError>;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Internal rule error: {0}")]
    Internal(String),
}

type ProduceFn = Arc<dyn Fn(&Failure, &RequestContext) -> RuleResult + Send + Sync>;

#[derive(Clone, Copy)]
struct TypeMatch {
    id: TypeId,
    name: &'static str,
}

impl TypeMatch {
    fn of<E: 'static>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }
}

/// One registered handler: a match set plus a response-producing function.
///
/// Rules are plain values registered explicitly at startup; there is no
/// scanning or subclassing step.
#[derive(Clone)]
pub struct Rule {
    tier: Tier,
    match_types: Vec<TypeMatch>,
    match_statuses: Vec<StatusCode>,
    produce: ProduceFn,
}

impl Rule {
    /// A typed-tier rule claiming failures tagged with `E`.
    pub fn typed<E, F>(produce: F) -> Self
    where
        E: 'static,
        F: Fn(&Failure, &RequestContext) -> RuleResult + Send + Sync + 'static,
    {
        Self {
            tier: Tier::Typed,
            match_types: vec![TypeMatch::of::<E>()],
            match_statuses: Vec::new(),
            produce: Arc::new(produce),
        }
    }

    /// Extend a typed rule's match set with another failure type.
    pub fn matching<E: 'static>(mut self) -> Self {
        self.match_types.push(TypeMatch::of::<E>());
        self
    }

    /// A status-aware rule claiming one exact status.
    pub fn status<F>(status: StatusCode, produce: F) -> Self
    where
        F: Fn(&Failure, &RequestContext) -> RuleResult + Send + Sync + 'static,
    {
        Self {
            tier: Tier::StatusAware,
            match_types: Vec::new(),
            match_statuses: vec![status],
            produce: Arc::new(produce),
        }
    }

    /// Extend a status-aware rule's match set with another status.
    pub fn or_status(mut self, status: StatusCode) -> Self {
        self.match_statuses.push(status);
        self
    }

    /// A status-aware rule matching every status. Exact-status rules always
    /// win over these.
    pub fn any_status<F>(produce: F) -> Self
    where
        F: Fn(&Failure, &RequestContext) -> RuleResult + Send + Sync + 'static,
    {
        Self {
            tier: Tier::StatusAware,
            match_types: Vec::new(),
            match_statuses: Vec::new(),
            produce: Arc::new(produce),
        }
    }

    /// The backstop rule, matching every otherwise-unhandled failure.
    pub fn catch_all<F>(produce: F) -> Self
    where
        F: Fn(&Failure, &RequestContext) -> RuleResult + Send + Sync + 'static,
    {
        Self {
            tier: Tier::CatchAll,
            match_types: Vec::new(),
            match_statuses: Vec::new(),
            produce: Arc::new(produce),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub(crate) fn matches_type(&self, id: TypeId) -> bool {
        self.match_types.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn matches_status(&self, status: StatusCode) -> bool {
        self.match_statuses.contains(&status)
    }

    pub(crate) fn matches_any_status(&self) -> bool {
        self.match_statuses.is_empty()
    }

    pub(crate) fn invoke(&self, failure: &Failure, context: &RequestContext) -> RuleResult {
        (self.produce)(failure, context)
    }

    /// Short label for resolution logs.
    pub(crate) fn describe(&self) -> String {
        match self.tier {
            Tier::Typed => {
                let names: Vec<&str> = self.match_types.iter().map(|entry| entry.name).collect();
                format!("Typed[{}]", names.join(", "))
            }
            Tier::StatusAware if self.match_statuses.is_empty() => {
                "StatusAware[any]".to_string()
            }
            Tier::StatusAware => {
                let codes: Vec<String> = self
                    .match_statuses
                    .iter()
                    .map(|status| status.as_u16().to_string())
                    .collect();
                format!("StatusAware[{}]", codes.join(", "))
            }
            Tier::CatchAll => "CatchAll".to_string(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("tier", &self.tier)
            .field("matches", &self.describe())
            .finish()
    }
}

/// Thread-safe rule storage, registered once at startup.
pub struct HandlerRegistry {
    tiers: DashMap<Tier, Vec<Arc<Rule>>>,
    ancestry: DashMap<TypeId, TypeId>,
    type_names: DashMap<TypeId, &'static str>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            tiers: DashMap::new(),
            ancestry: DashMap::new(),
            type_names: DashMap::new(),
        }
    }

    /// Add a rule. Within a tier, registration order is preserved and later
    /// rules win ties.
    pub fn register(&self, rule: Rule) -> &Self {
        for entry in &rule.match_types {
            self.type_names.insert(entry.id, entry.name);
        }
        self.tiers.entry(rule.tier).or_default().push(Arc::new(rule));
        self
    }

    /// Declare `Child` a subtype of `Parent` in the ancestry table.
    ///
    /// Each type has at most one parent; re-registering replaces the edge.
    /// Edges that would close a cycle are rejected, which keeps the
    /// specificity walk finite.
    pub fn register_subtype<Child: 'static, Parent: 'static>(&self) -> Result<()> {
        let child = TypeId::of::<Child>();
        let parent = TypeId::of::<Parent>();
        if child == parent {
            return Err(FaultlineError::registry(format!(
                "{} cannot be its own ancestor",
                std::any::type_name::<Child>()
            )));
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(FaultlineError::registry(format!(
                    "subtype edge {} -> {} would create a cycle",
                    std::any::type_name::<Child>(),
                    std::any::type_name::<Parent>()
                )));
            }
            cursor = self.ancestry.get(&id).map(|entry| *entry);
        }
        self.type_names
            .insert(child, std::any::type_name::<Child>());
        self.type_names
            .insert(parent, std::any::type_name::<Parent>());
        self.ancestry.insert(child, parent);
        Ok(())
    }

    /// Rules of one tier, in registration order.
    pub fn rules_in_tier(&self, tier: Tier) -> Vec<Arc<Rule>> {
        self.tiers
            .get(&tier)
            .map(|rules| rules.value().clone())
            .unwrap_or_default()
    }

    /// The failure type itself followed by its registered ancestors,
    /// nearest first. Always finite: cycles are rejected at registration.
    pub fn ancestry_chain(&self, kind: TypeId) -> Vec<TypeId> {
        let mut chain = vec![kind];
        let mut cursor = self.ancestry.get(&kind).map(|entry| *entry);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.ancestry.get(&id).map(|entry| *entry);
        }
        chain
    }

    pub fn type_name(&self, id: TypeId) -> Option<&'static str> {
        self.type_names.get(&id).map(|entry| *entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::response::ApiResult;

    struct Base;
    struct Narrow;
    struct Narrower;

    fn produce(_: &Failure, _: &RequestContext) -> RuleResult {
        Ok(Some(Rendered::envelope(ApiResult::bare(0))))
    }

    fn noop_rule(tier: Tier) -> Rule {
        match tier {
            Tier::Typed => Rule::typed::<Base, _>(produce),
            Tier::StatusAware => Rule::any_status(produce),
            Tier::CatchAll => Rule::catch_all(produce),
        }
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = HandlerRegistry::new();
        registry.register(noop_rule(Tier::Typed));
        registry.register(noop_rule(Tier::Typed));
        registry.register(noop_rule(Tier::CatchAll));
        assert_eq!(registry.rules_in_tier(Tier::Typed).len(), 2);
        assert_eq!(registry.rules_in_tier(Tier::CatchAll).len(), 1);
        assert!(registry.rules_in_tier(Tier::StatusAware).is_empty());
    }

    #[test]
    fn test_ancestry_chain_walks_upward() {
        let registry = HandlerRegistry::new();
        registry.register_subtype::<Narrower, Narrow>().unwrap();
        registry.register_subtype::<Narrow, Base>().unwrap();
        let chain = registry.ancestry_chain(TypeId::of::<Narrower>());
        assert_eq!(
            chain,
            vec![
                TypeId::of::<Narrower>(),
                TypeId::of::<Narrow>(),
                TypeId::of::<Base>()
            ]
        );
    }

    #[test]
    fn test_chain_of_unregistered_type_is_just_itself() {
        let registry = HandlerRegistry::new();
        let chain = registry.ancestry_chain(TypeId::of::<Base>());
        assert_eq!(chain, vec![TypeId::of::<Base>()]);
    }

    #[test]
    fn test_self_edge_is_rejected() {
        let registry = HandlerRegistry::new();
        assert!(registry.register_subtype::<Base, Base>().is_err());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let registry = HandlerRegistry::new();
        registry.register_subtype::<Narrow, Base>().unwrap();
        assert!(registry.register_subtype::<Base, Narrow>().is_err());
    }

    #[test]
    fn test_type_names_recorded_for_diagnostics() {
        let registry = HandlerRegistry::new();
        registry.register_subtype::<Narrow, Base>().unwrap();
        assert!(
            registry
                .type_name(TypeId::of::<Narrow>())
                .unwrap()
                .contains("Narrow")
        );
    }
}
