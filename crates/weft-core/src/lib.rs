//! Minimal fiber-style UI reconciliation runtime.
//!
//! Given a declarative tree of [`Descriptor`]s, the reconciler computes the
//! host mutations needed to make a live host tree match it and performs them
//! through a pluggable [`HostAdapter`]. The algorithm is the classic
//! dual-tree (current / work-in-progress) diff: a depth-first work loop runs
//! a begin phase on the way down and a complete phase on the way up, and
//! function components keep persistent state across re-renders through
//! positional hook slots.
//!
//! The runtime is synchronous, single-priority and single-threaded: one pass
//! runs to completion or is abandoned wholesale, in which case the last
//! committed tree stays authoritative.

pub(crate) mod collections;

mod begin_work;
mod complete_work;
pub mod element;
pub mod fiber;
pub mod hooks;
pub mod host;
mod work_loop;

pub use element::{
    component, host as host_element, jsx, jsx_keyed, text, ComponentFn, Descriptor, Element,
    PropValue, Props, TypeTag,
};
pub use fiber::{
    create_work_in_progress, fiber_from_descriptor, EffectFlags, FiberArena, FiberId, FiberNode,
    MemoizedState, WorkTag,
};
pub use hooks::{use_state, Hook, SetState};
pub use host::{HostAdapter, HostHandle, HostOp, MemoryHost, MemoryNode};

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::collections::map::HashMap;

/// Identifier of a mounted root.
pub type RootId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    FiberMissing { id: FiberId },
    RootMissing { id: RootId },
    /// A function component's render panicked; the pass is abandoned.
    RenderFailed { id: FiberId },
    NotAComponent { id: FiberId },
    NotAHost { id: FiberId },
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FiberMissing { id } => write!(f, "fiber {id} missing"),
            Self::RootMissing { id } => write!(f, "root {id} missing"),
            Self::RenderFailed { id } => write!(f, "render of fiber {id} failed"),
            Self::NotAComponent { id } => {
                write!(f, "fiber {id} is not a function component")
            }
            Self::NotAHost { id } => write!(f, "fiber {id} is not a host component"),
        }
    }
}

impl std::error::Error for ReconcileError {}

/// One mounted container.
#[derive(Debug)]
pub struct RootContext {
    /// The external collaborator's root handle.
    pub container: HostHandle,
    /// The committed fiber tree.
    pub current: FiberId,
    /// The just-completed work-in-progress tree, between pass end and swap.
    pub finished_work: Option<FiberId>,
    /// Host instance currently attached to the container, if any.
    pub attached: Option<HostHandle>,
}

/// Shared state of one reconciler instance. Single-threaded by construction;
/// the `currently rendering` scope in [`hooks`] and the per-root slots here
/// are only ever written at pass boundaries.
pub(crate) struct ReconcilerCore {
    pub(crate) arena: RefCell<FiberArena>,
    pub(crate) roots: RefCell<HashMap<RootId, RootContext>>,
    pub(crate) host: Rc<RefCell<dyn HostAdapter>>,
    pub(crate) work_in_progress: Cell<Option<FiberId>>,
    /// Subtrees replaced during the in-flight pass; freed at commit,
    /// forgotten on abandonment.
    pub(crate) pending_deletions: RefCell<Vec<FiberId>>,
    next_root_id: Cell<RootId>,
}

/// The reconciliation runtime. Cheap to clone; all clones share one fiber
/// arena and host adapter.
#[derive(Clone)]
pub struct Reconciler {
    core: Rc<ReconcilerCore>,
}

impl Reconciler {
    pub fn new(host: Rc<RefCell<dyn HostAdapter>>) -> Self {
        Self {
            core: Rc::new(ReconcilerCore {
                arena: RefCell::new(FiberArena::new()),
                roots: RefCell::new(HashMap::default()),
                host,
                work_in_progress: Cell::new(None),
                pending_deletions: RefCell::new(Vec::new()),
                next_root_id: Cell::new(0),
            }),
        }
    }

    /// Convenience constructor wiring up a [`MemoryHost`], returned alongside
    /// the reconciler for inspection.
    pub fn with_memory_host() -> (Self, Rc<RefCell<MemoryHost>>) {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        (Self::new(host.clone()), host)
    }

    /// Mounts a descriptor tree into a container and runs the initial render
    /// pass. The only externally triggered entry into the work loop;
    /// re-renders happen through [`SetState`] handles.
    pub fn mount(&self, descriptor: Descriptor, container: HostHandle) -> RootId {
        let root = self.core.next_root_id.get();
        self.core.next_root_id.set(root + 1);

        let host_root = {
            let mut fiber = FiberNode::new(WorkTag::HostRoot, Props::new(), None);
            fiber.update_queue = Some(descriptor);
            fiber.root = Some(root);
            self.core.arena.borrow_mut().create(fiber)
        };
        self.core.roots.borrow_mut().insert(
            root,
            RootContext {
                container,
                current: host_root,
                finished_work: None,
                attached: None,
            },
        );
        log::debug!("mounted root {root} into container {container}");
        self.schedule_update_on_fiber(host_root);
        root
    }

    /// Triggers a render pass for the tree containing `fiber`. A fiber with
    /// no reachable host root is silently ignored.
    pub fn schedule_update_on_fiber(&self, fiber: FiberId) {
        work_loop::schedule_update_on_fiber(&self.core, fiber);
    }

    /// The committed fiber tree of a root, if mounted.
    pub fn current(&self, root: RootId) -> Option<FiberId> {
        self.core.roots.borrow().get(&root).map(|context| context.current)
    }

    /// Read access to the fiber arena.
    pub fn arena(&self) -> Ref<'_, FiberArena> {
        self.core.arena.borrow()
    }

    /// Debug rendering of a root's committed fiber tree.
    pub fn dump_root(&self, root: RootId) -> String {
        match self.current(root) {
            Some(fiber) => self.core.arena.borrow().dump_tree(fiber),
            None => "(not mounted)\n".to_owned(),
        }
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Rc<ReconcilerCore> {
        &self.core
    }
}

#[cfg(test)]
mod tests;
