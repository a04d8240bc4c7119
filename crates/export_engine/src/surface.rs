//! Offscreen render surface: an isolated document sized to one physical page.

use std::sync::Arc;
use std::time::Duration;

use export_logging::export_debug;

use crate::dom::{Element, Fragment};
use crate::fonts::FontBook;
use crate::host::{AttachedNode, HostPage, TempNodeKind};
use crate::layout::{layout_page, DisplayList};
use crate::sanitize::{sanitize_fragment, SanitizeProfile};
use crate::types::PageGeometry;

/// Class of the page wrapper inside the surface document.
pub const PAGE_CLASS: &str = "page";

/// An isolated document attached to the host page off-viewport.
///
/// Detached from the host when dropped.
#[derive(Debug)]
pub struct RenderSurface {
    _frame: AttachedNode,
    geometry: PageGeometry,
    document: String,
    page: Element,
}

impl RenderSurface {
    /// Materializes already sanitized HTML inside a fresh isolated document.
    pub fn acquire(host: &Arc<HostPage>, sanitized_html: &str, geometry: PageGeometry) -> Self {
        let frame = host.attach(TempNodeKind::RenderFrame);
        let document = isolated_document(sanitized_html, &geometry);

        // The surface sees only what survived sanitization; re-parsing mirrors
        // writing the markup into the frame.
        let Fragment { nodes } = sanitize_fragment(sanitized_html, SanitizeProfile::Raster);
        let mut page = Element::new("div");
        page.attrs.push(("class".into(), PAGE_CLASS.into()));
        page.children = nodes;

        export_debug!(
            "render surface {:.0}x{:.0}px, {} top-level nodes",
            geometry.width_px(),
            geometry.min_height_px(),
            page.children.len()
        );
        Self {
            _frame: frame,
            geometry,
            document,
            page,
        }
    }

    /// Waits for fonts and images to settle. Fixed delay, not event-driven.
    pub async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Handle to the page root element.
    pub fn page(&self) -> &Element {
        &self.page
    }

    /// Full markup of the isolated document.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn layout(&self, fonts: &dyn FontBook) -> DisplayList {
        layout_page(&self.page, &self.geometry, fonts)
    }
}

fn isolated_document(body: &str, geometry: &PageGeometry) -> String {
    format!(
        concat!(
            "<!doctype html><html><head><meta charset=\"utf-8\"><style>",
            "* {{ box-sizing: border-box; }} ",
            "body {{ margin: 0; background: #ffffff; color: #111111; ",
            "font-family: Inter, system-ui, -apple-system, 'Segoe UI', Roboto, sans-serif; }} ",
            ".{class} {{ width: {width}mm; min-height: {height}mm; padding: {padding}mm; }}",
            "</style></head><body><div class=\"{class}\">{body}</div></body></html>"
        ),
        class = PAGE_CLASS,
        width = geometry.width_mm,
        height = geometry.height_mm,
        padding = geometry.padding_mm,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_detaches_on_drop() {
        let host = HostPage::new();
        let surface = RenderSurface::acquire(&host, "<p>Hi</p>", PageGeometry::default());
        assert_eq!(host.attached_nodes(), vec![TempNodeKind::RenderFrame]);
        assert!(surface.document().contains("width: 210mm"));
        assert_eq!(surface.page().text_content(), "Hi");
        drop(surface);
        assert!(host.attached_nodes().is_empty());
    }
}
