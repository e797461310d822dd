//! Tenant authentication seam.
//!
//! The sync engine never talks to an identity provider directly; the host
//! application supplies an implementation of [`TenantAuth`] whose lifetime is
//! tied to the signed-in session.

/// Provides the identity of the currently signed-in tenant (professor).
///
/// `current_tenant` is consulted at cycle start and again between
/// collections, so a mid-cycle sign-out stops further work.
pub trait TenantAuth: Send + Sync {
    /// Tenant id of the signed-in professor, or `None` when signed out.
    fn current_tenant(&self) -> Option<String>;

    /// Bearer token for the cloud document API, when one is available.
    fn access_token(&self) -> Option<String>;
}
