//! Access to a principal group's outstanding proxy announcements.

use keeper_core::error::LedgerError;
use keeper_core::ports::PrincipalGroup;
use keeper_core::types::{Announcement, CallHash};

use crate::types::CancelReport;

/// Announcements whose call hash equals `hash`.
pub fn matching<'a>(
    announcements: &'a [Announcement],
    hash: &'a CallHash,
) -> impl Iterator<Item = &'a Announcement> + 'a {
    announcements.iter().filter(move |a| &a.call_hash == hash)
}

/// Cancel every outstanding announcement of `group` matching `hash`.
///
/// Zero matches is not an error: the announcement was already resolved.
/// A failed cancel is logged and counted, and the remaining matches are
/// still attempted. Only a failure to list announcements is returned.
pub async fn cancel_matching(
    group: &dyn PrincipalGroup,
    hash: &CallHash,
) -> Result<CancelReport, LedgerError> {
    let announcements = group.announcements().await?;
    let mut report = CancelReport::default();

    for announcement in matching(&announcements, hash) {
        report.matched += 1;
        match group.cancel(announcement).await {
            Ok(()) => {
                report.cancelled += 1;
                tracing::info!(
                    controller = %group.controller(),
                    call_hash = %announcement.call_hash,
                    "Cancelled announcement"
                );
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    controller = %group.controller(),
                    call_hash = %announcement.call_hash,
                    error = %e,
                    "Failed to cancel announcement"
                );
            }
        }
    }

    if report.matched > 1 {
        tracing::warn!(
            controller = %group.controller(),
            call_hash = %hash,
            matched = report.matched,
            "Multiple announcements shared one call hash"
        );
    }

    Ok(report)
}
