//! Request-authentication gate middleware.
//!
//! A gate wraps individual route handlers in a larger request-routing
//! framework: on each guarded request it lazily resolves the session's
//! claimed identity, evaluates an optional ACL, and either forwards the
//! request annotated with the identity or short-circuits to a failure
//! response. Keep the public surface thin and split implementation across
//! sub-modules.

pub mod acl;
pub mod context;
pub mod error;
pub mod gate;
pub mod store;

pub use acl::Acl;
pub use context::{RequestContext, ResponseContext};
pub use error::GateError;
pub use gate::{
    AclChecker, FailureHandler, Gate, GateSettings, Guard, IdentityResolver, Next,
    ATTRIBUTE_NAME, SESSION_KEY,
};
pub use store::{MemorySessionStore, SessionStore};
