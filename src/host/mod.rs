//! The narrow interface between the assistant core and the page that hosts
//! it. The core never sees the host's structure beyond these calls.

pub mod mount;
pub mod page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Element lookups the core is allowed to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    /// `tag[name="value"]`
    AttributeEquals {
        tag: &'a str,
        name: &'a str,
        value: &'a str,
    },
    /// `tag[marker], [marker] tag`
    Marked { tag: &'a str, marker: &'a str },
}

pub trait HostSurface {
    /// First element in document order matching `selector`.
    fn query(&self, selector: &Selector<'_>) -> Option<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn is_root(&self, node: NodeId) -> bool;
    fn text(&self, node: NodeId) -> Option<String>;
    fn set_text(&mut self, node: NodeId, text: &str);
    /// Hands the form to the host, which decides what running it means.
    fn submit(&mut self, form: NodeId);
}
