//! The hosting page that export calls attach temporary artifacts to.
//!
//! Every temporary node and object URL is owned by a guard that releases it on
//! drop, so teardown happens on success, on error and on panic alike.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use export_logging::export_trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempNodeKind {
    /// Isolated, off-viewport frame hosting a render surface.
    RenderFrame,
    /// Synthetic anchor clicked to start a download.
    DownloadAnchor,
}

#[derive(Debug)]
struct ObjectUrlEntry {
    mime_type: String,
    bytes: Bytes,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    nodes: BTreeMap<u64, TempNodeKind>,
    object_urls: BTreeMap<u64, ObjectUrlEntry>,
}

impl Registry {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct HostPage {
    registry: Mutex<Registry>,
}

impl HostPage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock leaves the maps consistent.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a temporary node to the page.
    pub fn attach(self: &Arc<Self>, kind: TempNodeKind) -> AttachedNode {
        let id = {
            let mut registry = self.registry();
            let id = registry.allocate_id();
            registry.nodes.insert(id, kind);
            id
        };
        export_trace!("attached {kind:?} #{id}");
        AttachedNode {
            host: Arc::clone(self),
            id,
            kind,
        }
    }

    /// Kinds of the temporary nodes currently attached, in attach order.
    pub fn attached_nodes(&self) -> Vec<TempNodeKind> {
        self.registry().nodes.values().copied().collect()
    }

    pub fn create_object_url(self: &Arc<Self>, bytes: Bytes, mime_type: &str) -> ObjectUrl {
        let id = {
            let mut registry = self.registry();
            let id = registry.allocate_id();
            registry.object_urls.insert(
                id,
                ObjectUrlEntry {
                    mime_type: mime_type.to_string(),
                    bytes,
                },
            );
            id
        };
        ObjectUrl {
            host: Arc::clone(self),
            id,
            url: format!("blob:resume-export/{id}"),
        }
    }

    pub fn live_object_urls(&self) -> usize {
        self.registry().object_urls.len()
    }

    /// Looks up the bytes behind a live object URL.
    pub fn fetch_object_url(&self, url: &ObjectUrl) -> Option<(String, Bytes)> {
        self.registry()
            .object_urls
            .get(&url.id)
            .map(|entry| (entry.mime_type.clone(), entry.bytes.clone()))
    }

    fn detach(&self, id: u64) {
        if let Some(kind) = self.registry().nodes.remove(&id) {
            export_trace!("detached {kind:?} #{id}");
        }
    }

    fn revoke(&self, id: u64) {
        self.registry().object_urls.remove(&id);
    }
}

/// Guard for a temporary node; detaches it on drop.
pub struct AttachedNode {
    host: Arc<HostPage>,
    id: u64,
    kind: TempNodeKind,
}

impl AttachedNode {
    pub fn kind(&self) -> TempNodeKind {
        self.kind
    }
}

impl fmt::Debug for AttachedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Drop for AttachedNode {
    fn drop(&mut self) {
        self.host.detach(self.id);
    }
}

/// Guard for a transient binary object reference; revokes it on drop.
pub struct ObjectUrl {
    host: Arc<HostPage>,
    id: u64,
    url: String,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.host.revoke(self.id);
    }
}
