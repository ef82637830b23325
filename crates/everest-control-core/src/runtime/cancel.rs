// everest-control-core/src/runtime/cancel.rs
// ============================================================================
// Module: Cancellation
// Description: Races external calls against a caller-owned cancellation token.
// Purpose: Abort the current step on cancellation without starting the next.
// Dependencies: tokio, tokio-util
// ============================================================================

//! ## Overview
//! Cancellation drops the in-flight future. Nothing is rolled back: the
//! cluster keeps whatever state the last completed call produced.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::runtime::error::ControlPlaneError;

/// Fails fast when the token is already cancelled.
///
/// # Errors
///
/// Returns [`ControlPlaneError::Cancelled`] when cancellation was requested.
pub fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), ControlPlaneError> {
    if cancel.is_cancelled() { Err(ControlPlaneError::Cancelled) } else { Ok(()) }
}

/// Runs a future until it completes or the token is cancelled.
///
/// A token cancelled before the call never polls the future.
///
/// # Errors
///
/// Returns [`ControlPlaneError::Cancelled`] on cancellation, otherwise the
/// future's own result.
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T, ControlPlaneError>
where
    F: Future<Output = Result<T, ControlPlaneError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ControlPlaneError::Cancelled),
        result = future => result,
    }
}
