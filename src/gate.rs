//! The authentication gate: lazy identity resolution with a per-scope
//! cache, the permit/clear session lifecycle, and the authorize-or-reject
//! decision run on every guarded request.
//!
//! The gate owns no policy of its own. Three injected capabilities do the
//! actual work: an [`IdentityResolver`] maps the session's opaque reference
//! to a principal, an [`AclChecker`] decides whether that principal
//! satisfies a route's ACL, and a [`FailureHandler`] renders the response
//! on denial. All three accept plain closures.
//!
//! One gate instance corresponds to one logical request/session scope: the
//! resolution cache lives on the instance, so a gate must not be shared
//! across concurrently in-flight requests belonging to different sessions.
//! Construction is cheap; build one per request over shared collaborators.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tracing::debug;

use crate::acl::Acl;
use crate::context::{RequestContext, ResponseContext};
use crate::error::GateError;
use crate::store::SessionStore;

/// Default session key, namespaced to avoid collisions with unrelated
/// session data.
pub const SESSION_KEY: &str = "authgate/gate/reference";

/// Default request-attribute name the resolved identity is exposed under.
pub const ATTRIBUTE_NAME: &str = "authgate/gate/identity";

/// Maps an identity reference to a principal, or to "none". Pure lookup;
/// may consult any external store. Failures propagate unchanged through
/// the gate.
pub trait IdentityResolver<K, T>: Send + Sync {
    fn resolve(
        &self,
        reference: Option<&K>,
        request: Option<&RequestContext<T>>,
    ) -> Result<Option<T>>;
}

impl<K, T, F> IdentityResolver<K, T> for F
where
    F: Fn(Option<&K>, Option<&RequestContext<T>>) -> Result<Option<T>> + Send + Sync,
{
    fn resolve(
        &self,
        reference: Option<&K>,
        request: Option<&RequestContext<T>>,
    ) -> Result<Option<T>> {
        self(reference, request)
    }
}

/// Decides whether a resolved identity satisfies the requested ACL. Only
/// invoked when a guarded route actually requested one.
pub trait AclChecker<T>: Send + Sync {
    fn check(&self, identity: &T, acl: &[String]) -> Result<bool>;
}

impl<T, F> AclChecker<T> for F
where
    F: Fn(&T, &[String]) -> Result<bool> + Send + Sync,
{
    fn check(&self, identity: &T, acl: &[String]) -> Result<bool> {
        self(identity, acl)
    }
}

/// Renders the response emitted on denial. Denial is a normal outcome,
/// not an error, so this is infallible.
pub trait FailureHandler<T>: Send + Sync {
    fn handle(&self, request: &RequestContext<T>, response: ResponseContext) -> ResponseContext;
}

impl<T, F> FailureHandler<T> for F
where
    F: Fn(&RequestContext<T>, ResponseContext) -> ResponseContext + Send + Sync,
{
    fn handle(&self, request: &RequestContext<T>, response: ResponseContext) -> ResponseContext {
        self(request, response)
    }
}

/// Stand-in checker used when none was supplied. Requesting an ACL with
/// this in place is a configuration defect and errors out on first use.
struct MissingAclChecker;

impl<T> AclChecker<T> for MissingAclChecker {
    fn check(&self, _identity: &T, _acl: &[String]) -> Result<bool> {
        Err(GateError::AclCheckerMissing.into())
    }
}

/// Default failure handler: plain "Forbidden" body, status 403.
struct ForbiddenFailure;

impl<T> FailureHandler<T> for ForbiddenFailure {
    fn handle(&self, _request: &RequestContext<T>, mut response: ResponseContext) -> ResponseContext {
        response.write("Forbidden");
        response.with_status(403)
    }
}

/// Optional construction-time overrides. Everything defaults: checker to
/// the erroring stand-in, failure to "Forbidden"/403, keys to the
/// namespaced constants.
pub struct GateSettings<T> {
    pub check_acl: Option<Arc<dyn AclChecker<T>>>,
    pub failure: Option<Arc<dyn FailureHandler<T>>>,
    pub session_key: Option<String>,
    pub attribute_name: Option<String>,
}

impl<T> Default for GateSettings<T> {
    fn default() -> Self {
        Self { check_acl: None, failure: None, session_key: None, attribute_name: None }
    }
}

/// Downstream handler continuation a guard forwards to on grant.
pub type Next<'a, T> =
    &'a (dyn Fn(&mut RequestContext<T>, ResponseContext) -> Result<ResponseContext> + Send + Sync);

/// Chain-compatible guard produced by [`Gate::secure`].
pub type Guard<T> = Box<
    dyn Fn(&mut RequestContext<T>, ResponseContext, Next<'_, T>) -> Result<ResponseContext>
        + Send
        + Sync,
>;

/// The gate. Generic over `K` (the opaque identity reference persisted in
/// the session) and `T` (the resolver-verified identity).
pub struct Gate<K, T> {
    resolver: Arc<dyn IdentityResolver<K, T>>,
    check_acl: Arc<dyn AclChecker<T>>,
    failure: Arc<dyn FailureHandler<T>>,
    store: Arc<dyn SessionStore<K>>,
    session_key: String,
    attribute_name: String,
    /// Last non-absent resolution for this scope. Absence is never cached:
    /// while unauthenticated each call re-invokes the resolver.
    cached: RwLock<Option<T>>,
}

impl<K, T> Gate<K, T>
where
    K: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        resolver: impl IdentityResolver<K, T> + 'static,
        store: Arc<dyn SessionStore<K>>,
        settings: GateSettings<T>,
    ) -> Self {
        Self {
            resolver: Arc::new(resolver),
            check_acl: settings.check_acl.unwrap_or_else(|| Arc::new(MissingAclChecker)),
            failure: settings.failure.unwrap_or_else(|| Arc::new(ForbiddenFailure)),
            store,
            session_key: settings.session_key.unwrap_or_else(|| SESSION_KEY.to_string()),
            attribute_name: settings.attribute_name.unwrap_or_else(|| ATTRIBUTE_NAME.to_string()),
            cached: RwLock::new(None),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// Bind `reference` to the session and prime the cache with the
    /// already-resolved `identity` in one step. Called by login flows;
    /// no redundant resolver invocation afterwards.
    pub fn permit(&self, reference: K, identity: T) {
        self.store.set(&self.session_key, Some(reference));
        *self.cached.write() = Some(identity);
        debug!(target: "authgate", "gate.permit key={}", self.session_key);
    }

    /// Remove the session binding and drop the cached identity. Called by
    /// logout flows.
    pub fn clear(&self) {
        self.store.set(&self.session_key, None);
        *self.cached.write() = None;
        debug!(target: "authgate", "gate.clear key={}", self.session_key);
    }

    /// Current identity for this scope, resolving lazily.
    ///
    /// Cache hit returns without touching the resolver. Otherwise the
    /// stored reference (absent if unset) goes to the resolver exactly
    /// once; only a non-absent result is cached.
    pub fn get_authenticated(&self, request: Option<&RequestContext<T>>) -> Result<Option<T>> {
        if let Some(identity) = self.cached.read().as_ref().cloned() {
            return Ok(Some(identity));
        }
        let reference = self.store.get(&self.session_key);
        let resolved = self.resolver.resolve(reference.as_ref(), request)?;
        if resolved.is_some() {
            *self.cached.write() = resolved.clone();
        }
        Ok(resolved)
    }

    /// The decision: no identity → denied; no ACL → any authenticated
    /// identity suffices; otherwise the checker rules on the normalized
    /// token slice.
    fn authenticate(
        &self,
        request: &RequestContext<T>,
        acl: Option<&Acl>,
    ) -> Result<(bool, Option<T>)> {
        let Some(identity) = self.get_authenticated(Some(request))? else {
            return Ok((false, None));
        };
        let Some(acl) = acl else {
            return Ok((true, Some(identity)));
        };
        let allowed = self.check_acl.check(&identity, acl.as_slice())?;
        Ok((allowed, Some(identity)))
    }

    /// Run the decision for one request. On grant the identity is attached
    /// to the request under the configured attribute name and `next` runs;
    /// on denial the failure handler renders the response and `next` is
    /// never called.
    pub fn intercept(
        &self,
        request: &mut RequestContext<T>,
        response: ResponseContext,
        next: Next<'_, T>,
        acl: Option<&Acl>,
    ) -> Result<ResponseContext> {
        match self.authenticate(request, acl)? {
            (true, Some(identity)) => {
                *self.cached.write() = Some(identity.clone());
                request.set_attribute(&self.attribute_name, identity);
                next(request, response)
            }
            _ => {
                debug!(target: "authgate", "gate.deny method={} path={}", request.method, request.path);
                Ok(self.failure.handle(request, response))
            }
        }
    }

    /// Guard factory: capture `acl` and delegate to [`Gate::intercept`].
    /// The returned closure is the unit composed into a route chain; it
    /// carries no state beyond the captured ACL and the gate handle.
    /// Call on an `Arc<Gate>` (clone it first to keep a handle).
    pub fn secure(self: Arc<Self>, acl: Option<Acl>) -> Guard<T> {
        Box::new(move |request, response, next| self.intercept(request, response, next, acl.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;

    fn null_resolver(_: Option<&u64>, _: Option<&RequestContext<String>>) -> Result<Option<String>> {
        Ok(None)
    }

    #[test]
    fn default_failure_writes_forbidden_403() {
        let handler = ForbiddenFailure;
        let req: RequestContext<String> = RequestContext::default();
        let resp = FailureHandler::handle(&handler, &req, ResponseContext::new());
        assert_eq!(resp.body, "Forbidden");
        assert_eq!(resp.status, 403);
    }

    #[test]
    fn missing_checker_errors_on_use() {
        let err = <MissingAclChecker as AclChecker<String>>::check(&MissingAclChecker, &"u".to_string(), &[])
            .expect_err("stand-in checker must error");
        assert!(err.to_string().contains("not implemented [check_acl]"));
    }

    #[test]
    fn default_keys_are_the_namespaced_constants() {
        let store = Arc::new(MemorySessionStore::<u64>::new());
        let gate = Gate::new(null_resolver, store, GateSettings::default());
        assert_eq!(gate.session_key(), SESSION_KEY);
        assert_eq!(gate.attribute_name(), ATTRIBUTE_NAME);
    }
}
