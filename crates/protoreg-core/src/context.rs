//! Operation context with cancellation and request correlation.
//!
//! Every public store and registry operation takes an [`OpContext`] and
//! checks it at suspension points (blob, manifest, and metadata I/O). A
//! cancelled context makes the suspended operation return
//! `RegistryError::Cancelled`; state already committed is left in place,
//! which is safe because the content-addressed layers never rewrite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{RegistryError, Result};

/// Unique identifier for a single request or operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random RequestId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle used by callers to cancel an in-flight operation
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Signal cancellation to every context sharing this token
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Cancellation-bearing context carried through every operation
#[derive(Debug, Clone)]
pub struct OpContext {
    request_id: RequestId,
    cancelled: Arc<AtomicBool>,
}

impl OpContext {
    /// Create a new context with a fresh RequestId
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the request id for log correlation
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Get a token that cancels this context when fired
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(Arc::clone(&self.cancelled))
    }

    /// Check whether the context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Cancelled` if the context has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Cancelled` naming `op` once the paired
    /// [`CancelToken`] has fired.
    pub fn check(&self, op: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(RegistryError::Cancelled { op: op.to_string() });
        }
        Ok(())
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_not_cancelled() {
        let ctx = OpContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check("op").is_ok());
    }

    #[test]
    fn test_cancel_token_fires_all_clones() {
        let ctx = OpContext::new();
        let token = ctx.cancel_token();
        let clone = ctx.clone();

        token.cancel();

        assert!(ctx.is_cancelled());
        assert!(clone.is_cancelled());
        let err = ctx.check("create_commit").unwrap_err();
        assert!(matches!(err, RegistryError::Cancelled { .. }));
    }
}
