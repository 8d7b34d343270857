//! Transaction engine contract.
//!
//! An engine receives an immutable [`TransactionRequest`] and resolves to a
//! single success flag. Why a transaction failed is the engine's business:
//! it may log the details, but callers only ever see `false`.

pub mod pacman;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TransactionError;
use crate::models::TransactionRequest;

pub use pacman::PacmanEngine;

/// Executes package transactions.
///
/// `execute` must return without blocking; the work happens when the
/// returned future is polled. The future resolves exactly once and cannot be
/// cancelled once the engine has started the underlying operation.
pub trait TransactionEngine: Send + Sync {
    fn execute(&self, request: TransactionRequest) -> BoxFuture<'static, bool>;
}

// Package names as accepted by pacman, and never starting with a dash so a
// target cannot be mistaken for an option.
static PACKAGE_TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9@_+][a-zA-Z0-9@._+\-]*$").expect("package target pattern is valid")
});

/// Check a request before handing it to a package manager process.
pub fn validate_targets(request: &TransactionRequest) -> Result<(), TransactionError> {
    if request.targets().is_empty() {
        return Err(TransactionError::NoTargets);
    }

    for target in request.targets() {
        if !PACKAGE_TARGET_RE.is_match(target) {
            return Err(TransactionError::InvalidTarget(target.clone()));
        }
    }

    Ok(())
}
