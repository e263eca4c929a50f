//! Render nodes, the fiber arena and the dual-tree manager.
//!
//! One [`FiberNode`] is one logical UI position for one generation. Nodes
//! live in a slot arena and link to each other by index: `parent` is a
//! non-owning back-reference used only for upward walks, `child`/`sibling`
//! form the tree proper, and `alternate` cross-links the node with its
//! counterpart in the other generation (the double-buffering 2-cycle).

use std::fmt::Write as _;

use bitflags::bitflags;

use crate::element::{Descriptor, Element, Props, TypeTag};
use crate::hooks::Hook;
use crate::host::HostHandle;
use crate::{ReconcileError, RootId};

/// Index of a fiber in the arena.
pub type FiberId = usize;

/// Behavior tag of a render node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkTag {
    FunctionComponent,
    HostRoot,
    HostComponent,
    HostText,
}

bitflags! {
    /// Pending host mutations accumulated during the complete phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EffectFlags: u8 {
        const PLACEMENT = 1 << 0;
        const UPDATE = 1 << 1;
        const CHILD_DELETION = 1 << 2;
    }
}

/// Per-kind state snapshot of a fiber.
#[derive(Clone, Debug, Default)]
pub enum MemoizedState {
    #[default]
    None,
    /// Head of a function component's hook list, in call order.
    Hooks(Vec<Hook>),
}

/// One render node.
#[derive(Debug)]
pub struct FiberNode {
    pub tag: WorkTag,
    /// The underlying descriptor type; `None` for root and text fibers.
    pub element_type: Option<TypeTag>,
    pub key: Option<String>,
    /// Props supplied for the in-flight pass. Read only by the begin phase.
    pub pending_props: Props,
    /// Props as of the last time this node's begin phase finished.
    pub memoized_props: Option<Props>,
    pub memoized_state: MemoizedState,
    /// Work payload; for a host root, the mounted descriptor.
    pub update_queue: Option<Descriptor>,
    /// The concrete host instance bound to this node, once created.
    pub host_binding: Option<HostHandle>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Position among siblings, used for host insertion ordering.
    pub index: u32,
    /// Counterpart in the other generation. Forms a 2-cycle, never owns.
    pub alternate: Option<FiberId>,
    pub flags: EffectFlags,
    /// For `HostRoot` fibers, the root context this tree hangs off.
    pub root: Option<RootId>,
}

impl FiberNode {
    pub fn new(tag: WorkTag, pending_props: Props, key: Option<String>) -> Self {
        Self {
            tag,
            element_type: None,
            key,
            pending_props,
            memoized_props: None,
            memoized_state: MemoizedState::None,
            update_queue: None,
            host_binding: None,
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            alternate: None,
            flags: EffectFlags::empty(),
            root: None,
        }
    }

    pub(crate) fn hooks(&self) -> Option<&Vec<Hook>> {
        match &self.memoized_state {
            MemoizedState::Hooks(hooks) => Some(hooks),
            MemoizedState::None => None,
        }
    }
}

/// Slot arena holding every live fiber of every mounted root.
#[derive(Default)]
pub struct FiberArena {
    fibers: Vec<Option<FiberNode>>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, fiber: FiberNode) -> FiberId {
        let id = self.fibers.len();
        self.fibers.push(Some(fiber));
        id
    }

    pub fn get(&self, id: FiberId) -> Result<&FiberNode, ReconcileError> {
        self.fibers
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(ReconcileError::FiberMissing { id })
    }

    pub fn get_mut(&mut self, id: FiberId) -> Result<&mut FiberNode, ReconcileError> {
        self.fibers
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(ReconcileError::FiberMissing { id })
    }

    pub fn contains(&self, id: FiberId) -> bool {
        matches!(self.fibers.get(id), Some(Some(_)))
    }

    /// Number of live fibers.
    pub fn len(&self) -> usize {
        self.fibers.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frees a discarded subtree: the fiber, every descendant, and the
    /// alternate generation of each. Ids that are already gone are skipped.
    pub fn remove_subtree(&mut self, id: FiberId) {
        let mut stack = vec![id];
        while let Some(fiber_id) = stack.pop() {
            let Some(fiber) = self.fibers.get_mut(fiber_id).and_then(Option::take) else {
                continue;
            };
            if let Some(alternate) = fiber.alternate {
                stack.push(alternate);
            }
            let mut next = fiber.child;
            while let Some(child_id) = next {
                next = self
                    .fibers
                    .get(child_id)
                    .and_then(Option::as_ref)
                    .and_then(|child| child.sibling);
                stack.push(child_id);
            }
        }
    }

    /// Indented debug rendering of the fiber tree under `root`.
    pub fn dump_tree(&self, root: FiberId) -> String {
        let mut output = String::new();
        self.dump_fiber(&mut output, root, 0);
        output
    }

    fn dump_fiber(&self, output: &mut String, id: FiberId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Ok(fiber) = self.get(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        let label = match (&fiber.tag, &fiber.element_type) {
            (WorkTag::HostComponent, Some(TypeTag::Host(tag))) => format!("<{tag}>"),
            (WorkTag::HostText, _) => {
                format!("{:?}", fiber.pending_props.text_content().unwrap_or(""))
            }
            (tag, _) => format!("{tag:?}"),
        };
        let _ = writeln!(output, "{indent}[{id}] {label}");
        let mut next = fiber.child;
        while let Some(child_id) = next {
            self.dump_fiber(output, child_id, depth + 1);
            next = self
                .get(child_id)
                .ok()
                .and_then(|child| child.sibling);
        }
    }
}

/// Dual-tree manager: gets or creates the work-in-progress counterpart of
/// `current` and primes it with `pending_props`.
///
/// First call for a node allocates the mirror and cross-links the two
/// generations; every later call reuses the alternate in place, so a tree of
/// N logical positions never grows past 2N fibers across its lifetime.
pub fn create_work_in_progress(
    arena: &mut FiberArena,
    current: FiberId,
    pending_props: Props,
) -> Result<FiberId, ReconcileError> {
    let wip = match arena.get(current)?.alternate {
        None => {
            let source = arena.get(current)?;
            let mut mirror = FiberNode::new(source.tag, pending_props, source.key.clone());
            mirror.host_binding = source.host_binding;
            mirror.root = source.root;
            mirror.alternate = Some(current);
            let wip = arena.create(mirror);
            arena.get_mut(current)?.alternate = Some(wip);
            wip
        }
        Some(wip) => {
            let node = arena.get_mut(wip)?;
            node.pending_props = pending_props;
            node.flags = EffectFlags::empty();
            node.sibling = None;
            wip
        }
    };

    let (element_type, update_queue, child, memoized_props, memoized_state, host_binding) = {
        let source = arena.get(current)?;
        (
            source.element_type.clone(),
            source.update_queue.clone(),
            source.child,
            source.memoized_props.clone(),
            source.memoized_state.clone(),
            source.host_binding,
        )
    };
    let node = arena.get_mut(wip)?;
    node.element_type = element_type;
    node.update_queue = update_queue;
    node.child = child;
    node.memoized_props = memoized_props;
    node.memoized_state = memoized_state;
    node.host_binding = host_binding;
    Ok(wip)
}

/// Element→node conversion. Returns `None` for malformed descriptors, which
/// are diagnosed and skipped rather than treated as fatal.
pub fn fiber_from_descriptor(descriptor: &Descriptor) -> Option<FiberNode> {
    match descriptor {
        Descriptor::Text(content) => Some(FiberNode::new(
            WorkTag::HostText,
            Props::text(content.clone()),
            None,
        )),
        Descriptor::Element(element) => fiber_from_element(element),
    }
}

fn fiber_from_element(element: &Element) -> Option<FiberNode> {
    let tag = match &element.type_tag {
        TypeTag::Host(_) => WorkTag::HostComponent,
        TypeTag::Component(_) => WorkTag::FunctionComponent,
        TypeTag::Root => {
            log::warn!("root marker used as a child descriptor; ignoring it");
            return None;
        }
    };
    let mut fiber = FiberNode::new(tag, element.props.clone(), element.key.clone());
    fiber.element_type = Some(element.type_tag.clone());
    Some(fiber)
}
