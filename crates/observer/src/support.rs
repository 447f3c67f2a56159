//! Platform capability checks.

use std::sync::OnceLock;

use dom::{BulkRemoval, Dom, NodeId};
use tracing::debug;

static STANDARD_IS_BUGGY: OnceLock<bool> = OnceLock::new();
static ORPHAN_IS_BUGGY: OnceLock<bool> = OnceLock::new();

/// `true` if clearing a node's children under `mode` also strips the links
/// inside the removed subtrees, so removed descendants cannot be walked
/// afterwards. Probed once per mode and cached for the process lifetime.
pub fn bulk_removal_is_buggy(mode: BulkRemoval) -> bool {
    let cell = match mode {
        BulkRemoval::Standard => &STANDARD_IS_BUGGY,
        BulkRemoval::Orphan => &ORPHAN_IS_BUGGY,
    };
    *cell.get_or_init(|| probe(mode))
}

fn probe(mode: BulkRemoval) -> bool {
    let mut dom = Dom::with_bulk_removal(mode);
    let a = dom.create_html_element("div");
    let b = dom.create_html_element("div");
    let c = dom.create_html_element("div");
    dom.append_child(a, b);
    dom.append_child(b, c);
    dom.clear_children(a);
    let buggy = dom.parent(c) != Some(b);
    debug!(?mode, buggy, "probed bulk removal");
    buggy
}

/// Only elements take part in selector matching.
pub fn supports_selector_matching(dom: &Dom, node: NodeId) -> bool {
    dom.is_element(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_tells_modes_apart() {
        assert!(!bulk_removal_is_buggy(BulkRemoval::Standard));
        assert!(bulk_removal_is_buggy(BulkRemoval::Orphan));
        // cached
        assert!(bulk_removal_is_buggy(BulkRemoval::Orphan));
    }

    #[test]
    fn only_elements_match() {
        let mut dom = Dom::new();
        let doc = dom.create_document();
        let div = dom.create_html_element("div");
        let text = dom.create_text("x");
        assert!(supports_selector_matching(&dom, div));
        assert!(!supports_selector_matching(&dom, text));
        assert!(!supports_selector_matching(&dom, doc));
    }
}
