/// Camera image novelty check.
///
/// The camera publishes a new file name for every snapshot, so the file
/// name alone identifies an image. A cycle only downloads when the page
/// points at a different file than the last one recorded.
///
/// Any doubt resolves to "novel": a redundant download is cheap, silently
/// skipping a new snapshot is not.

use crate::model::{HistoryRecord, ImageLocator};

/// Returns `true` if `locator` names a different image than `last`.
///
/// - no locator → `false` (nothing to fetch)
/// - no last record, or last record without an image → `true`
/// - locator without a derivable file name → `true`
/// - otherwise, file names differ → `true`
pub fn is_novel(locator: Option<&ImageLocator>, last: Option<&HistoryRecord>) -> bool {
    let Some(locator) = locator else {
        return false;
    };

    let last_filename = last.and_then(|record| record.image_path.as_deref());
    match (locator.filename(), last_filename) {
        (Some(candidate), Some(previous)) => candidate != previous,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
