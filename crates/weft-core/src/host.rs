//! Host adapter boundary and the in-memory reference host.
//!
//! The reconciler never inspects a [`HostHandle`]; it only threads handles
//! between the three adapter operations and stores them on fibers.

use std::fmt::Write as _;

/// Opaque handle to a concrete element in the rendering backend.
pub type HostHandle = usize;

/// The three operations the reconciler needs from a rendering backend, plus
/// the container attach used at commit.
pub trait HostAdapter {
    fn create_instance(&mut self, tag: &str) -> HostHandle;
    fn create_text_instance(&mut self, text: &str) -> HostHandle;
    fn append_child(&mut self, parent: HostHandle, child: HostHandle);
    /// Same primitive as [`HostAdapter::append_child`] aimed at the mounted
    /// container.
    fn append_to_container(&mut self, container: HostHandle, child: HostHandle) {
        self.append_child(container, child);
    }
}

/// One recorded adapter call, in issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    CreateInstance { tag: String, instance: HostHandle },
    CreateTextInstance { text: String, instance: HostHandle },
    AppendChild { parent: HostHandle, child: HostHandle },
    AppendToContainer { container: HostHandle, child: HostHandle },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum MemoryNodeKind {
    Container,
    Element(String),
    Text(String),
}

/// One node of the in-memory host tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryNode {
    kind: MemoryNodeKind,
    children: Vec<HostHandle>,
}

impl MemoryNode {
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            MemoryNodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            MemoryNodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn children(&self) -> &[HostHandle] {
        &self.children
    }
}

/// Recording host backend: a slot vector of nodes plus an operation log for
/// call-sequence assertions.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a root container to mount into.
    pub fn create_container(&mut self) -> HostHandle {
        self.push(MemoryNodeKind::Container)
    }

    pub fn node(&self, handle: HostHandle) -> Option<&MemoryNode> {
        self.nodes.get(handle)
    }

    /// Every adapter call issued so far, in order.
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Indented rendering of the host tree under `root`.
    pub fn dump_tree(&self, root: HostHandle) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, handle: HostHandle, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.nodes.get(handle) else {
            let _ = writeln!(output, "{indent}[{handle}] (missing)");
            return;
        };
        let label = match &node.kind {
            MemoryNodeKind::Container => "(container)".to_owned(),
            MemoryNodeKind::Element(tag) => format!("<{tag}>"),
            MemoryNodeKind::Text(text) => format!("{text:?}"),
        };
        let _ = writeln!(output, "{indent}[{handle}] {label}");
        for child in node.children.clone() {
            self.dump_node(output, child, depth + 1);
        }
    }

    fn push(&mut self, kind: MemoryNodeKind) -> HostHandle {
        let handle = self.nodes.len();
        self.nodes.push(MemoryNode {
            kind,
            children: Vec::new(),
        });
        handle
    }
}

impl HostAdapter for MemoryHost {
    fn create_instance(&mut self, tag: &str) -> HostHandle {
        let instance = self.push(MemoryNodeKind::Element(tag.to_owned()));
        self.ops.push(HostOp::CreateInstance {
            tag: tag.to_owned(),
            instance,
        });
        instance
    }

    fn create_text_instance(&mut self, text: &str) -> HostHandle {
        let instance = self.push(MemoryNodeKind::Text(text.to_owned()));
        self.ops.push(HostOp::CreateTextInstance {
            text: text.to_owned(),
            instance,
        });
        instance
    }

    fn append_child(&mut self, parent: HostHandle, child: HostHandle) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        self.ops.push(HostOp::AppendChild { parent, child });
    }

    fn append_to_container(&mut self, container: HostHandle, child: HostHandle) {
        if let Some(node) = self.nodes.get_mut(container) {
            node.children.push(child);
        }
        self.ops.push(HostOp::AppendToContainer { container, child });
    }
}
