use crate::context::Scope;
use crate::editor::{locate_editor, locate_form};
use crate::host::{HostSurface, NodeId};
use tracing::debug;

pub const PLUGIN_NAME: &str = "datasette-llm-sql-writer";
pub const PANEL_ELEMENT_ID: &str = "llm-sql-writer-panel";
pub const PANEL_LABEL: &str = "LLM SQL Writer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDescriptor {
    pub id: String,
    pub label: String,
}

impl PanelDescriptor {
    pub fn assistant() -> Self {
        Self {
            id: PANEL_ELEMENT_ID.to_string(),
            label: PANEL_LABEL.to_string(),
        }
    }
}

/// What the host offers for attaching the panel.
pub trait MountTarget: HostSurface {
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    /// Creates an element that is not yet part of the document.
    fn create_element(&mut self, tag: &str, id: &str) -> NodeId;
    /// Returns false when `anchor` has no parent or `node` is already placed.
    fn insert_before(&mut self, node: NodeId, anchor: NodeId) -> bool;
    /// Host-managed panel slot above a table listing.
    fn register_panel(&mut self, plugin: &str, descriptor: PanelDescriptor);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mounted {
    AboveTable(PanelDescriptor),
    BeforeEditor(NodeId),
    Skipped,
}

/// Table pages go through the host's panel registry. Other pages get a
/// container in front of the SQL editor, at most once per document.
pub fn mount<T: MountTarget + ?Sized>(target: &mut T, scope: &Scope) -> Mounted {
    if scope.is_table_page() {
        let descriptor = PanelDescriptor::assistant();
        target.register_panel(PLUGIN_NAME, descriptor.clone());
        debug!(scope = %scope.describe(), "panel registered above table");
        return Mounted::AboveTable(descriptor);
    }

    let Some(editor) = locate_editor(target) else {
        return Mounted::Skipped;
    };
    if target.element_by_id(PANEL_ELEMENT_ID).is_some() {
        return Mounted::Skipped;
    }

    let anchor = locate_form(target, editor)
        .map(|form| form.0)
        .unwrap_or(editor.0);
    let container = target.create_element("div", PANEL_ELEMENT_ID);
    if !target.insert_before(container, anchor) {
        return Mounted::Skipped;
    }

    debug!(scope = %scope.describe(), "panel inserted before editor");
    Mounted::BeforeEditor(container)
}
