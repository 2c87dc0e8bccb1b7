use crate::context::Scope;
use crate::host::mount::{MountTarget, PanelDescriptor};
use crate::host::{HostSurface, NodeId, Selector};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Attribute carried by the element that lists query results.
pub const ROWS_MARKER: &str = "data-table-rows";
pub const SQL_FIELD: &str = "sql";
/// Table pages keep the custom SQL box out of the filter parameters.
pub const TABLE_SQL_FIELD: &str = "_sql";

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            text: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredPanel {
    pub plugin: String,
    pub descriptor: PanelDescriptor,
}

/// A form handed to the host for execution, with its named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub form: NodeId,
    pub action: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl Submission {
    pub fn sql(&self) -> Option<&str> {
        self.fields
            .get(SQL_FIELD)
            .or_else(|| self.fields.get(TABLE_SQL_FIELD))
            .map(String::as_str)
    }
}

/// In-memory element tree standing in for the host document.
#[derive(Debug, Clone)]
pub struct Page {
    location: String,
    elements: Vec<Element>,
    panels: Vec<RegisteredPanel>,
    submissions: Vec<Submission>,
}

impl Page {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            elements: vec![Element::new("body")],
            panels: Vec::new(),
            submissions: Vec::new(),
        }
    }

    /// Builds the layout the data browser serves for `location`: a database
    /// or query page carries a named SQL textarea, a table page a marked one.
    pub fn for_location(location: &str) -> Self {
        let scope = Scope::from_location(location);
        let mut page = Self::new(location);
        let root = page.root();

        let heading = page.append(root, "h1", &[]);
        page.set_text(heading, &scope.describe());

        let Some(db) = scope.data_source.as_deref() else {
            return page;
        };

        match scope.table.as_deref() {
            Some(table) => {
                let action = format!("/{db}/{table}");
                let form = page.append(root, "form", &[("action", action.as_str()), ("method", "get")]);
                let wrapper = page.append(form, "div", &[("data-sql-editor", "")]);
                page.append(wrapper, "textarea", &[("name", TABLE_SQL_FIELD)]);
            }
            None => {
                let action = format!("/{db}/-/query");
                let form = page.append(root, "form", &[("action", action.as_str()), ("method", "get")]);
                page.append(form, "textarea", &[("name", SQL_FIELD)]);
            }
        }
        page.append(root, "div", &[(ROWS_MARKER, "")]);
        page
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn append(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.detached(tag, attributes);
        self.attach(id, parent, None);
        id
    }

    fn detached(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut element = Element::new(tag);
        for (name, value) in attributes {
            element
                .attributes
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
        self.elements.push(element);
        NodeId::new(self.elements.len() - 1)
    }

    fn attach(&mut self, node: NodeId, parent: NodeId, position: Option<usize>) {
        let children = &mut self.elements[parent.index()].children;
        match position {
            Some(index) => children.insert(index, node),
            None => children.push(node),
        }
        self.elements[node.index()].parent = Some(parent);
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        self.elements.get(node.index())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attributes
            .get(name)
            .map(String::as_str)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node)
            .map(|element| element.children.as_slice())
            .unwrap_or_default()
    }

    /// Elements reachable from the root, in document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        order
    }

    fn has_marked_ancestor(&self, node: NodeId, marker: &str) -> bool {
        let mut current = self.element(node).and_then(|element| element.parent);
        while let Some(ancestor) = current {
            if self.has_attribute(ancestor, marker) {
                return true;
            }
            current = self.element(ancestor).and_then(|element| element.parent);
        }
        false
    }

    fn matches(&self, node: NodeId, selector: &Selector<'_>) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };
        match *selector {
            Selector::AttributeEquals { tag, name, value } => {
                element.tag == tag && element.attributes.get(name).map(String::as_str) == Some(value)
            }
            Selector::Marked { tag, marker } => {
                element.tag == tag
                    && (element.attributes.contains_key(marker)
                        || self.has_marked_ancestor(node, marker))
            }
        }
    }

    fn form_fields(&self, form: NodeId) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let mut stack = self.children(form).to_vec();
        while let Some(node) = stack.pop() {
            if let Some(element) = self.element(node) {
                if let Some(name) = element.attributes.get("name") {
                    fields.insert(name.clone(), element.text.clone());
                }
                stack.extend(element.children.iter().copied());
            }
        }
        fields
    }

    pub fn panels(&self) -> &[RegisteredPanel] {
        &self.panels
    }

    pub fn take_submissions(&mut self) -> Vec<Submission> {
        std::mem::take(&mut self.submissions)
    }
}

impl HostSurface for Page {
    fn query(&self, selector: &Selector<'_>) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|node| self.matches(*node, selector))
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node)?.parent
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|element| element.tag.clone())
    }

    fn is_root(&self, node: NodeId) -> bool {
        node == self.root()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|element| element.text.clone())
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.elements.get_mut(node.index()) {
            element.text = text.to_string();
        }
    }

    fn submit(&mut self, form: NodeId) {
        let submission = Submission {
            form,
            action: self.attribute(form, "action").map(str::to_string),
            fields: self.form_fields(form),
        };
        self.submissions.push(submission);
    }
}

impl MountTarget for Page {
    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        (0..self.elements.len())
            .map(NodeId::new)
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    fn create_element(&mut self, tag: &str, id: &str) -> NodeId {
        self.detached(tag, &[("id", id)])
    }

    fn insert_before(&mut self, node: NodeId, anchor: NodeId) -> bool {
        let Some(parent) = self.parent(anchor) else {
            return false;
        };
        if self.parent(node).is_some() {
            return false;
        }
        let position = self
            .children(parent)
            .iter()
            .position(|child| *child == anchor)
            .unwrap_or_default();
        self.attach(node, parent, Some(position));
        true
    }

    fn register_panel(&mut self, plugin: &str, descriptor: PanelDescriptor) {
        self.panels.push(RegisteredPanel {
            plugin: plugin.to_string(),
            descriptor,
        });
    }
}

/// Page shared between the UI thread and the orchestrator task. Locks are
/// held per call and never across an await.
#[derive(Debug, Clone)]
pub struct SharedPage(Arc<Mutex<Page>>);

impl SharedPage {
    pub fn new(page: Page) -> Self {
        Self(Arc::new(Mutex::new(page)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Page> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HostSurface for SharedPage {
    fn query(&self, selector: &Selector<'_>) -> Option<NodeId> {
        self.lock().query(selector)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().parent(node)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.lock().tag_name(node)
    }

    fn is_root(&self, node: NodeId) -> bool {
        self.lock().is_root(node)
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.lock().text(node)
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.lock().set_text(node, text);
    }

    fn submit(&mut self, form: NodeId) {
        self.lock().submit(form);
    }
}
