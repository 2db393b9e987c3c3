/*!
 * Utility functions and helpers for tellbridge.
 */
use std::future::Future;
use std::time::Duration;

use tracing::trace;

/// Run a state-changing future, then hold for `settle` before returning
///
/// The vendor backend queues commands; spacing them out keeps the queue
/// short. The output of the future is returned unchanged, whether it
/// succeeded or not.
///
/// # Arguments
///
/// * `settle` - How long to wait after the future completes
/// * `future` - The command to run
pub async fn throttled<F, T>(settle: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    let output = future.await;
    if !settle.is_zero() {
        trace!("Settling for {:?}", settle);
        tokio::time::sleep(settle).await;
    }
    output
}
