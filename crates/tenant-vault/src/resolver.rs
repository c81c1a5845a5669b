//! Resolving a resource's class relative to the requesting actor.
//!
//! Spec step 1 of the decision procedure asks the engine to "resolve
//! `resource_class` relative to `actor_id`" even though `AccessRequest`
//! already carries a caller-supplied `resource_class`. We treat the
//! resolver's answer as authoritative: a caller-supplied class that
//! disagrees with what the resolver computes is a sign the caller is
//! attempting to broaden its own access, and the request is denied rather
//! than trusted. Concrete deployments implement this trait against their
//! ownership/share-list/case-membership/org-membership store; for tests and
//! single-tenant setups, `TrustingResolver` always returns `None`, which
//! tells the engine it has no opinion and should fall back to the
//! caller-supplied class instead of overriding it.

use async_trait::async_trait;
use tenant_types::ResourceClass;

/// Computes the authoritative [`ResourceClass`] of a resource relative to
/// an actor, independent of what the actor claims.
#[async_trait]
pub trait ResourceClassResolver: Send + Sync {
    /// Resolve `resource_id`'s class relative to `actor_id`. Returns `None`
    /// if the resource does not exist or the actor has no relationship to
    /// it at all (treated the same as `System` by the caller: nothing but
    /// `admin`/`legal`/`manager` read access applies).
    async fn resolve(&self, actor_id: &str, resource_id: &str) -> Option<ResourceClass>;
}

/// A resolver that trusts the caller-supplied class outright. Useful for
/// tests and for deployments where resource class is assigned at creation
/// time and never needs a relationship lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustingResolver;

#[async_trait]
impl ResourceClassResolver for TrustingResolver {
    async fn resolve(&self, _actor_id: &str, _resource_id: &str) -> Option<ResourceClass> {
        None
    }
}
