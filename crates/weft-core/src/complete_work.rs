//! Complete phase: host instance creation and update flagging on the way up.
//!
//! Children complete before their parents, so by the time a host fiber gets
//! here every host instance in its subtree already exists and the subtree
//! can be assembled bottom-up.

use std::rc::Rc;

use crate::element::TypeTag;
use crate::fiber::{EffectFlags, FiberId, WorkTag};
use crate::host::HostHandle;
use crate::{ReconcileError, ReconcilerCore};

pub(crate) fn complete_work(
    core: &Rc<ReconcilerCore>,
    wip: FiberId,
) -> Result<(), ReconcileError> {
    let (tag, has_binding) = {
        let arena = core.arena.borrow();
        let fiber = arena.get(wip)?;
        (fiber.tag, fiber.host_binding.is_some())
    };
    match tag {
        WorkTag::HostComponent => {
            if has_binding {
                mark_if_props_changed(core, wip)?;
            } else {
                let tag_name = {
                    let arena = core.arena.borrow();
                    match &arena.get(wip)?.element_type {
                        Some(TypeTag::Host(name)) => name.clone(),
                        _ => return Err(ReconcileError::NotAHost { id: wip }),
                    }
                };
                let instance = core.host.borrow_mut().create_instance(&tag_name);
                append_all_children(core, instance, wip)?;
                core.arena.borrow_mut().get_mut(wip)?.host_binding = Some(instance);
            }
        }
        WorkTag::HostText => {
            if has_binding {
                mark_if_text_changed(core, wip)?;
            } else {
                let content = core
                    .arena
                    .borrow()
                    .get(wip)?
                    .pending_props
                    .text_content()
                    .unwrap_or_default()
                    .to_owned();
                let instance = core.host.borrow_mut().create_text_instance(&content);
                core.arena.borrow_mut().get_mut(wip)?.host_binding = Some(instance);
            }
        }
        // Nothing to assemble; their host content lives in descendants.
        WorkTag::HostRoot | WorkTag::FunctionComponent => {}
    }
    Ok(())
}

/// Update-pass diff. `memoized_props` on the work-in-progress fiber was
/// already overwritten by the work loop, so the last committed props are
/// read off the alternate.
fn mark_if_props_changed(core: &Rc<ReconcilerCore>, wip: FiberId) -> Result<(), ReconcileError> {
    let mut arena = core.arena.borrow_mut();
    let changed = {
        let fiber = arena.get(wip)?;
        match fiber.alternate {
            Some(alternate) => {
                arena.get(alternate)?.memoized_props.as_ref() != Some(&fiber.pending_props)
            }
            None => true,
        }
    };
    if changed {
        arena.get_mut(wip)?.flags |= EffectFlags::UPDATE;
    }
    Ok(())
}

fn mark_if_text_changed(core: &Rc<ReconcilerCore>, wip: FiberId) -> Result<(), ReconcileError> {
    let mut arena = core.arena.borrow_mut();
    let changed = {
        let fiber = arena.get(wip)?;
        let new_text = fiber.pending_props.text_content().unwrap_or_default();
        match fiber.alternate {
            Some(alternate) => {
                let old = arena.get(alternate)?;
                old.memoized_props
                    .as_ref()
                    .and_then(|props| props.text_content())
                    .unwrap_or_default()
                    != new_text
            }
            None => true,
        }
    };
    if changed {
        arena.get_mut(wip)?.flags |= EffectFlags::UPDATE;
    }
    Ok(())
}

/// Appends the host instances of the nearest host descendants of `wip` into
/// `parent_handle`, skipping over function-component fibers in between.
fn append_all_children(
    core: &Rc<ReconcilerCore>,
    parent_handle: HostHandle,
    wip: FiberId,
) -> Result<(), ReconcileError> {
    let arena = core.arena.borrow();
    let mut host = core.host.borrow_mut();
    let mut node = arena.get(wip)?.child;
    while let Some(id) = node {
        let fiber = arena.get(id)?;
        if let Some(binding) = fiber.host_binding {
            host.append_child(parent_handle, binding);
        } else if let Some(child) = fiber.child {
            node = Some(child);
            continue;
        }
        // Climb until a sibling is found or we are back at `wip`.
        let mut current = id;
        loop {
            if current == wip {
                return Ok(());
            }
            let fiber = arena.get(current)?;
            if let Some(sibling) = fiber.sibling {
                node = Some(sibling);
                break;
            }
            match fiber.parent {
                Some(parent) if parent != wip => current = parent,
                _ => return Ok(()),
            }
        }
    }
    Ok(())
}
