//! Hook store: per-fiber persistent state slots, indexed by call order.
//!
//! While a function component renders, a thread-local session records which
//! fiber is rendering and walks its hook list. The session is released by a
//! drop guard, so a panicking component can never leave the binding behind
//! for a later, unrelated render to corrupt.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::thread_local;

use crate::element::{Descriptor, TypeTag};
use crate::fiber::{FiberId, MemoizedState};
use crate::work_loop::schedule_update_on_fiber;
use crate::{ReconcileError, ReconcilerCore};

/// One persistent state slot of a function component.
///
/// The payload is an `Rc<RefCell<T>>` behind `dyn Any`; cloning a hook list
/// across generations shares the cells, which is what lets a setter handed
/// out during one render reach the slot that later renders read.
#[derive(Clone)]
pub struct Hook {
    pub(crate) state: Rc<dyn Any>,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

struct RenderSession {
    core: Weak<ReconcilerCore>,
    fiber: FiberId,
    /// Hook list of the previous generation; `None` on first mount.
    previous: Option<Vec<Hook>>,
    cursor: usize,
    next: Vec<Hook>,
}

thread_local! {
    static RENDER_SESSION: RefCell<Option<RenderSession>> = const { RefCell::new(None) };
}

/// Clears the thread-local session when the render scope ends, normally or
/// by panic.
struct SessionGuard;

impl Drop for SessionGuard {
    fn drop(&mut self) {
        RENDER_SESSION.with(|session| session.borrow_mut().take());
    }
}

/// Renders a function-component fiber with an active hook session and stores
/// the rebuilt hook list on the fiber. A panic inside the component is
/// contained here and surfaced as a pass-level error.
pub(crate) fn render_with_hooks(
    core: &Rc<ReconcilerCore>,
    wip: FiberId,
) -> Result<Descriptor, ReconcileError> {
    let (component, props, previous) = {
        let arena = core.arena.borrow();
        let fiber = arena.get(wip)?;
        let component = match &fiber.element_type {
            Some(TypeTag::Component(f)) => *f,
            _ => {
                return Err(ReconcileError::NotAComponent { id: wip });
            }
        };
        let previous = fiber
            .alternate
            .and_then(|alternate| arena.get(alternate).ok())
            .and_then(|current| current.hooks().cloned());
        (component, fiber.pending_props.clone(), previous)
    };

    core.arena.borrow_mut().get_mut(wip)?.memoized_state = MemoizedState::None;

    RENDER_SESSION.with(|session| {
        *session.borrow_mut() = Some(RenderSession {
            core: Rc::downgrade(core),
            fiber: wip,
            previous,
            cursor: 0,
            next: Vec::new(),
        });
    });
    let _guard = SessionGuard;
    let rendered = panic::catch_unwind(AssertUnwindSafe(|| component(&props)));
    let session = RENDER_SESSION.with(|session| session.borrow_mut().take());

    let child = rendered.map_err(|_| ReconcileError::RenderFailed { id: wip })?;
    if let Some(session) = session {
        core.arena.borrow_mut().get_mut(wip)?.memoized_state =
            MemoizedState::Hooks(session.next);
    }
    Ok(child)
}

/// Setter half of [`use_state`]. Writes the slot and schedules a re-render
/// of the owning fiber.
#[derive(Clone)]
pub struct SetState<T> {
    slot: Rc<RefCell<T>>,
    fiber: FiberId,
    core: Weak<ReconcilerCore>,
}

impl<T: Clone + 'static> SetState<T> {
    pub fn set(&self, value: T) {
        *self.slot.borrow_mut() = value;
        if let Some(core) = self.core.upgrade() {
            schedule_update_on_fiber(&core, self.fiber);
        }
    }
}

/// State-accessor primitive. Mount appends a fresh slot initialized with
/// `init`; update advances the cursor and reuses the existing slot.
///
/// # Panics
///
/// Panics when called outside a component render, when a render uses more
/// hooks than the previous one, or when a slot's type changes between
/// renders. During a pass these panics are contained at the render boundary
/// and abandon the pass.
pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, SetState<T>) {
    RENDER_SESSION.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let session = borrow
            .as_mut()
            .expect("use_state called outside of a function component render");
        let slot: Rc<RefCell<T>> = match &session.previous {
            Some(previous) => {
                let hook = previous.get(session.cursor).unwrap_or_else(|| {
                    panic!(
                        "render used more hooks than the previous render ({} known)",
                        previous.len()
                    )
                });
                Rc::clone(&hook.state)
                    .downcast::<RefCell<T>>()
                    .unwrap_or_else(|_| panic!("hook {} changed type between renders", session.cursor))
            }
            None => Rc::new(RefCell::new(init())),
        };
        session.cursor += 1;
        session.next.push(Hook {
            state: slot.clone() as Rc<dyn Any>,
        });
        let value = slot.borrow().clone();
        let setter = SetState {
            slot,
            fiber: session.fiber,
            core: session.core.clone(),
        };
        (value, setter)
    })
}

#[cfg(test)]
pub(crate) fn session_is_active() -> bool {
    RENDER_SESSION.with(|session| session.borrow().is_some())
}
