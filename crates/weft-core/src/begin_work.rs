//! Begin phase: per-kind child reconciliation on the way down.

use std::rc::Rc;

use crate::element::{Descriptor, Props};
use crate::fiber::{
    create_work_in_progress, fiber_from_descriptor, EffectFlags, FiberId, WorkTag,
};
use crate::hooks::render_with_hooks;
use crate::{ReconcileError, ReconcilerCore};

/// Reconciles `wip`'s children against the previous generation and returns
/// the first child to descend into, or `None` for leaves.
pub(crate) fn begin_work(
    core: &Rc<ReconcilerCore>,
    wip: FiberId,
) -> Result<Option<FiberId>, ReconcileError> {
    let tag = core.arena.borrow().get(wip)?.tag;
    match tag {
        WorkTag::HostRoot => {
            let descriptor = core.arena.borrow().get(wip)?.update_queue.clone();
            reconcile_children(core, wip, descriptor.into_iter().collect())
        }
        WorkTag::FunctionComponent => {
            let child = render_with_hooks(core, wip)?;
            reconcile_children(core, wip, vec![child])
        }
        WorkTag::HostComponent => {
            let children = core.arena.borrow().get(wip)?.pending_props.children();
            reconcile_children(core, wip, children)
        }
        WorkTag::HostText => Ok(None),
    }
}

/// Child reconciliation: old children are reused position-wise through the
/// dual-tree manager when the old and new lists line up by length, type and
/// key; any mismatch discards the old children and mounts fresh fibers. No
/// keyed list diffing.
fn reconcile_children(
    core: &Rc<ReconcilerCore>,
    wip: FiberId,
    descriptors: Vec<Descriptor>,
) -> Result<Option<FiberId>, ReconcileError> {
    let descriptors: Vec<Descriptor> = descriptors
        .into_iter()
        .filter(|descriptor| is_well_formed(descriptor))
        .collect();

    let old_first = {
        let arena = core.arena.borrow();
        let fiber = arena.get(wip)?;
        match fiber.alternate {
            Some(alternate) => arena.get(alternate)?.child,
            None => None,
        }
    };

    if descriptors.len() == 1 {
        let child = reconcile_single_child(core, wip, old_first, &descriptors[0])?;
        core.arena.borrow_mut().get_mut(wip)?.child = child;
        return Ok(child);
    }

    if let Some(first) = reuse_child_chain(core, wip, old_first, &descriptors)? {
        return Ok(Some(first));
    }

    // Replace-all path: drop whatever was there and mount the new list.
    if old_first.is_some() {
        delete_child_chain(core, wip, old_first)?;
    }
    let mut arena = core.arena.borrow_mut();
    let mut first = None;
    let mut previous: Option<FiberId> = None;
    for (index, descriptor) in descriptors.iter().enumerate() {
        let Some(mut fiber) = fiber_from_descriptor(descriptor) else {
            continue;
        };
        fiber.parent = Some(wip);
        fiber.index = index as u32;
        fiber.flags |= EffectFlags::PLACEMENT;
        let id = arena.create(fiber);
        match previous {
            None => first = Some(id),
            Some(previous) => arena.get_mut(previous)?.sibling = Some(id),
        }
        previous = Some(id);
    }
    arena.get_mut(wip)?.child = first;
    Ok(first)
}

/// Position-wise reuse for multi-child lists: when the old chain and the new
/// list have the same length and every position matches by type and key,
/// each old child flips to its alternate. Any mismatch returns `None` and
/// the caller falls back to replace-all.
fn reuse_child_chain(
    core: &Rc<ReconcilerCore>,
    wip: FiberId,
    old_first: Option<FiberId>,
    descriptors: &[Descriptor],
) -> Result<Option<FiberId>, ReconcileError> {
    if descriptors.is_empty() {
        return Ok(None);
    }
    let old_chain = {
        let arena = core.arena.borrow();
        let mut chain = Vec::new();
        let mut next = old_first;
        while let Some(id) = next {
            next = arena.get(id)?.sibling;
            chain.push(id);
        }
        chain
    };
    if old_chain.len() != descriptors.len() {
        return Ok(None);
    }
    for (old, descriptor) in old_chain.iter().zip(descriptors) {
        if !matches_descriptor(core, *old, descriptor)? {
            return Ok(None);
        }
    }

    let mut arena = core.arena.borrow_mut();
    let mut first = None;
    let mut previous: Option<FiberId> = None;
    for (index, (old, descriptor)) in old_chain.iter().zip(descriptors).enumerate() {
        let child = create_work_in_progress(&mut arena, *old, pending_props(descriptor))?;
        let node = arena.get_mut(child)?;
        node.parent = Some(wip);
        node.index = index as u32;
        match previous {
            None => first = Some(child),
            Some(previous) => arena.get_mut(previous)?.sibling = Some(child),
        }
        previous = Some(child);
    }
    arena.get_mut(wip)?.child = first;
    Ok(first)
}

fn reconcile_single_child(
    core: &Rc<ReconcilerCore>,
    wip: FiberId,
    old_first: Option<FiberId>,
    descriptor: &Descriptor,
) -> Result<Option<FiberId>, ReconcileError> {
    if let Some(old) = old_first {
        if matches_descriptor(core, old, descriptor)? {
            // Same logical position: flip to (or allocate) its alternate.
            let mut arena = core.arena.borrow_mut();
            let child = create_work_in_progress(&mut arena, old, pending_props(descriptor))?;
            let node = arena.get_mut(child)?;
            node.parent = Some(wip);
            node.index = 0;
            // The old position may have had trailing siblings.
            let trailing = arena.get(old)?.sibling;
            drop(arena);
            if trailing.is_some() {
                delete_child_chain(core, wip, trailing)?;
            }
            return Ok(Some(child));
        }
        delete_child_chain(core, wip, Some(old))?;
    }

    let Some(mut fiber) = fiber_from_descriptor(descriptor) else {
        return Ok(None);
    };
    fiber.parent = Some(wip);
    fiber.flags |= EffectFlags::PLACEMENT;
    let id = core.arena.borrow_mut().create(fiber);
    Ok(Some(id))
}

fn pending_props(descriptor: &Descriptor) -> Props {
    match descriptor {
        Descriptor::Element(element) => element.props.clone(),
        Descriptor::Text(content) => Props::text(content.clone()),
    }
}

/// Whether the old fiber can be reused for the new descriptor: same
/// discriminant and same key.
fn matches_descriptor(
    core: &Rc<ReconcilerCore>,
    old: FiberId,
    descriptor: &Descriptor,
) -> Result<bool, ReconcileError> {
    let arena = core.arena.borrow();
    let fiber = arena.get(old)?;
    Ok(match descriptor {
        Descriptor::Text(_) => fiber.tag == WorkTag::HostText,
        Descriptor::Element(element) => {
            fiber.element_type.as_ref() == Some(&element.type_tag) && fiber.key == element.key
        }
    })
}

/// Queues an abandoned child chain for deletion at commit and marks the
/// parent. Deletion must not happen mid-pass: if the pass is later
/// abandoned, the committed tree has to come through untouched.
fn delete_child_chain(
    core: &Rc<ReconcilerCore>,
    parent: FiberId,
    first: Option<FiberId>,
) -> Result<(), ReconcileError> {
    let mut arena = core.arena.borrow_mut();
    let mut deletions = core.pending_deletions.borrow_mut();
    let mut next = first;
    while let Some(id) = next {
        next = arena.get(id).ok().and_then(|fiber| fiber.sibling);
        deletions.push(id);
    }
    arena.get_mut(parent)?.flags |= EffectFlags::CHILD_DELETION;
    Ok(())
}

fn is_well_formed(descriptor: &Descriptor) -> bool {
    match descriptor {
        Descriptor::Text(_) => true,
        Descriptor::Element(element) => {
            if matches!(element.type_tag, crate::element::TypeTag::Root) {
                log::warn!("root marker used as a child descriptor; ignoring it");
                return false;
            }
            true
        }
    }
}
