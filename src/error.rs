//! Gate error model.
//!
//! Only configuration defects are errors. Denial (no identity, or the ACL
//! check coming back false) is a normal outcome routed through the failure
//! handler and never surfaces as an `Err`. Collaborator failures (resolver
//! or checker returning an error) propagate unchanged via `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    /// An ACL was requested on a guarded route but no checker was supplied
    /// at construction. A programming defect, surfaced on first use.
    #[error("not implemented [check_acl]")]
    AclCheckerMissing,
}
