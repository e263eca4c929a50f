//! Work loop: depth-first begin/complete traversal and the commit step.
//!
//! One pass runs to completion (or abandonment) before anything else
//! happens; the work-in-progress tree is never visible outside a pass.

use std::rc::Rc;

use crate::begin_work::begin_work;
use crate::complete_work::complete_work;
use crate::element::Props;
use crate::fiber::{create_work_in_progress, FiberId, WorkTag};
use crate::{ReconcileError, ReconcilerCore, RootId};

/// Entry point for every render request: state updates and initial mounts
/// both land here. An update on a fiber with no reachable host root is a
/// silent no-op.
pub(crate) fn schedule_update_on_fiber(core: &Rc<ReconcilerCore>, fiber: FiberId) {
    let Some(root) = mark_update_from_fiber_to_root(core, fiber) else {
        log::trace!("update scheduled on detached fiber {fiber}; ignoring");
        return;
    };
    render_root(core, root);
}

/// Walks parent links up from `fiber`; returns the root context only when
/// the walk ends at a live `HostRoot` fiber.
fn mark_update_from_fiber_to_root(core: &Rc<ReconcilerCore>, fiber: FiberId) -> Option<RootId> {
    let arena = core.arena.borrow();
    let mut node = arena.get(fiber).ok()?;
    while let Some(parent) = node.parent {
        node = arena.get(parent).ok()?;
    }
    if node.tag == WorkTag::HostRoot {
        node.root
    } else {
        None
    }
}

fn render_root(core: &Rc<ReconcilerCore>, root: RootId) {
    if let Err(error) = prepare_fresh_stack(core, root) {
        log::warn!("could not prepare a pass for root {root}: {error}");
        return;
    }

    if let Err(error) = work_loop(core) {
        // Abandon the in-flight tree; the committed one stays authoritative.
        log::warn!("render pass for root {root} failed: {error}");
        core.work_in_progress.set(None);
        core.pending_deletions.borrow_mut().clear();
        return;
    }

    commit_root(core, root);
}

/// Produces the fresh work-in-progress root and points the cursor at it.
fn prepare_fresh_stack(core: &Rc<ReconcilerCore>, root: RootId) -> Result<(), ReconcileError> {
    let current = {
        let roots = core.roots.borrow();
        let context = roots
            .get(&root)
            .ok_or(ReconcileError::RootMissing { id: root })?;
        context.current
    };
    let wip = create_work_in_progress(&mut core.arena.borrow_mut(), current, Props::new())?;
    core.work_in_progress.set(Some(wip));
    Ok(())
}

fn work_loop(core: &Rc<ReconcilerCore>) -> Result<(), ReconcileError> {
    while let Some(wip) = core.work_in_progress.get() {
        perform_unit_of_work(core, wip)?;
    }
    Ok(())
}

fn perform_unit_of_work(core: &Rc<ReconcilerCore>, fiber: FiberId) -> Result<(), ReconcileError> {
    let next = begin_work(core, fiber)?;
    {
        // Props are applied once begin finishes, before the subtree is
        // processed; a throw further down must not leave them stale.
        let mut arena = core.arena.borrow_mut();
        let node = arena.get_mut(fiber)?;
        node.memoized_props = Some(node.pending_props.clone());
    }
    match next {
        Some(child) => core.work_in_progress.set(Some(child)),
        None => complete_unit_of_work(core, fiber)?,
    }
    Ok(())
}

/// Post-order unwind: complete this node, then resume at its sibling or keep
/// unwinding through parents until the root completes.
fn complete_unit_of_work(core: &Rc<ReconcilerCore>, fiber: FiberId) -> Result<(), ReconcileError> {
    let mut node = Some(fiber);
    while let Some(id) = node {
        complete_work(core, id)?;
        let (sibling, parent) = {
            let arena = core.arena.borrow();
            let fiber = arena.get(id)?;
            (fiber.sibling, fiber.parent)
        };
        if let Some(sibling) = sibling {
            core.work_in_progress.set(Some(sibling));
            return Ok(());
        }
        node = parent;
        core.work_in_progress.set(None);
    }
    Ok(())
}

/// Swaps the finished tree in as `current`, frees subtrees queued for
/// deletion, and attaches the topmost host instance to the container when it
/// changed. The host boundary has no removal operation, so attachment is
/// append-only.
fn commit_root(core: &Rc<ReconcilerCore>, root: RootId) {
    {
        let mut roots = core.roots.borrow_mut();
        let Some(context) = roots.get_mut(&root) else {
            return;
        };
        let Some(finished) = core
            .arena
            .borrow()
            .get(context.current)
            .ok()
            .and_then(|fiber| fiber.alternate)
        else {
            return;
        };
        context.finished_work = Some(finished);
    }

    {
        let mut arena = core.arena.borrow_mut();
        for id in core.pending_deletions.borrow_mut().drain(..) {
            arena.remove_subtree(id);
        }
    }

    let mut roots = core.roots.borrow_mut();
    let Some(context) = roots.get_mut(&root) else {
        return;
    };
    let Some(finished) = context.finished_work.take() else {
        return;
    };
    context.current = finished;
    drop(roots);

    let top_binding = topmost_host_binding(core, finished);
    let mut roots = core.roots.borrow_mut();
    let Some(context) = roots.get_mut(&root) else {
        return;
    };
    if let Some(binding) = top_binding {
        if context.attached != Some(binding) {
            core.host
                .borrow_mut()
                .append_to_container(context.container, binding);
            context.attached = Some(binding);
            log::debug!("root {root}: attached host instance {binding}");
        }
    }
}

/// First host instance found walking down single-child links from the root.
fn topmost_host_binding(
    core: &Rc<ReconcilerCore>,
    root_fiber: FiberId,
) -> Option<crate::host::HostHandle> {
    let arena = core.arena.borrow();
    let mut node = arena.get(root_fiber).ok()?.child;
    while let Some(id) = node {
        let fiber = arena.get(id).ok()?;
        if let Some(binding) = fiber.host_binding {
            return Some(binding);
        }
        node = fiber.child;
    }
    None
}
