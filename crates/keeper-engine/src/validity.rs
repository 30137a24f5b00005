//! Commission checks for nomination targets.

use keeper_core::ports::ChainClient;
use keeper_core::types::{Address, Commission};

use crate::types::ValidityResult;

/// Check every target's current commission against `threshold`.
///
/// Results come back in target order. A target whose commission is above the
/// threshold is invalid. A failed lookup is logged and the target is
/// reported as indeterminate and invalid; it never aborts the batch.
pub async fn check_targets(
    chain: &dyn ChainClient,
    targets: &[Address],
    threshold: Commission,
) -> Vec<ValidityResult> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let result = match chain.commission(target).await {
            Ok(commission) => ValidityResult {
                target: target.clone(),
                commission: Some(commission),
                valid: commission <= threshold,
            },
            Err(e) => {
                tracing::warn!(
                    validator = %target,
                    error = %e,
                    "Commission lookup failed, treating target as invalid"
                );
                ValidityResult {
                    target: target.clone(),
                    commission: None,
                    valid: false,
                }
            }
        };
        results.push(result);
    }
    results
}

/// Logical AND over a batch. An empty batch is not valid.
pub fn all_valid(results: &[ValidityResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.valid)
}

pub fn invalid_targets(results: &[ValidityResult]) -> Vec<Address> {
    results
        .iter()
        .filter(|r| !r.valid)
        .map(|r| r.target.clone())
        .collect()
}
