//! Resource variant selection.

use crate::catalog::{CatalogItem, ResourceDescriptor};

/// Marker searched for in `protocolInfo` tags when the user gave no explicit
/// quality filter and no sized descriptor exists. RAW files typically expose
/// only thumbnail variants without sizes; `_LRG` picks the large one.
pub const DEFAULT_QUALITY_MARKER: &str = "_LRG";

/// Picks the url of the largest sized descriptor. Ties keep the first one
/// encountered.
fn best_sized(resources: &[ResourceDescriptor]) -> Option<&str> {
    let mut best: Option<(&str, u64)> = None;
    for res in resources {
        let (Some(url), Some(size)) = (res.url.as_deref(), res.size) else {
            continue;
        };
        if best.is_none_or(|(_, best_size)| size > best_size) {
            best = Some((url, size));
        }
    }
    best.map(|(url, _)| url)
}

/// Picks the first descriptor whose `protocolInfo` contains `marker`, in
/// declaration order.
fn tagged<'a>(resources: &'a [ResourceDescriptor], marker: &str) -> Option<&'a str> {
    resources
        .iter()
        .find(|res| {
            res.url.is_some()
                && res
                    .protocol_info
                    .as_deref()
                    .is_some_and(|info| info.contains(marker))
        })
        .and_then(|res| res.url.as_deref())
}

/// Selects the one url to download for an item.
///
/// Three tiers, first match wins:
/// 1. largest advertised size, only when no quality filter was given;
/// 2. first `protocolInfo` containing the marker (`_LRG` by default, the
///    caller's filter verbatim when given);
/// 3. the last descriptor that has a url at all.
///
/// An explicit filter bypasses the size tier entirely, even when sized
/// descriptors exist. That is the quality-override contract, not an
/// oversight (see DESIGN.md).
///
/// Returns `None` when no descriptor carries a url; the caller logs the item
/// and moves on.
#[must_use]
pub fn resolve<'a>(item: &'a CatalogItem, quality: Option<&str>) -> Option<&'a str> {
    if quality.is_none()
        && let Some(url) = best_sized(&item.resources)
    {
        return Some(url);
    }
    let marker = quality.unwrap_or(DEFAULT_QUALITY_MARKER);
    if let Some(url) = tagged(&item.resources, marker) {
        return Some(url);
    }
    // Empirically the last advertised variant is the best one when neither
    // sizes nor tags are usable.
    item.resources.iter().rev().find_map(|res| res.url.as_deref())
}
