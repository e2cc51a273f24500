//! Error Policy
//!
//! One wrapper applied to every store operation. Backend failures either
//! propagate as [`DocKvError::Operation`] or, in soft-fail mode, are logged
//! and replaced by the operation's safe default.

use std::future::Future;

use crate::error::{BackendResult, DocKvError, Result};

/// Fail-soft / fail-hard policy for backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    ignore_operation_error: bool,
}

impl ErrorPolicy {
    /// Propagate every backend failure
    pub fn strict() -> Self {
        Self {
            ignore_operation_error: false,
        }
    }

    /// Log backend failures and return safe defaults
    pub fn lenient() -> Self {
        Self {
            ignore_operation_error: true,
        }
    }

    pub fn new(ignore_operation_error: bool) -> Self {
        Self {
            ignore_operation_error,
        }
    }

    pub fn ignores_operation_errors(&self) -> bool {
        self.ignore_operation_error
    }

    /// Run `operation`, falling back to `T::default()` in soft-fail mode
    pub async fn guard<T, F>(&self, op: &'static str, operation: F) -> Result<T>
    where
        T: Default,
        F: Future<Output = BackendResult<T>>,
    {
        self.guard_or(op, T::default, operation).await
    }

    /// Run `operation`, falling back to `safe_default()` in soft-fail mode
    pub async fn guard_or<T, D, F>(&self, op: &'static str, safe_default: D, operation: F) -> Result<T>
    where
        D: FnOnce() -> T,
        F: Future<Output = BackendResult<T>>,
    {
        match operation.await {
            Ok(value) => Ok(value),
            Err(e) if self.ignore_operation_error => {
                tracing::warn!(op, error = %e, "operation failed, returning safe default");
                Ok(safe_default())
            }
            Err(e) => Err(DocKvError::Operation { op, source: e }),
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::strict()
    }
}
