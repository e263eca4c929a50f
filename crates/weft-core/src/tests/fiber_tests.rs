use crate::element::{host, text, Descriptor, Props, TypeTag};
use crate::fiber::{
    create_work_in_progress, fiber_from_descriptor, EffectFlags, FiberArena, FiberNode,
    MemoizedState, WorkTag,
};
use crate::hooks::Hook;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

fn host_fiber(arena: &mut FiberArena, tag: &str) -> usize {
    let descriptor = host(tag, Props::new(), []);
    arena.create(fiber_from_descriptor(&descriptor).expect("well-formed descriptor"))
}

#[test]
fn first_alternate_is_allocated_and_cross_linked() {
    let mut arena = FiberArena::new();
    let current = host_fiber(&mut arena, "div");
    let wip = create_work_in_progress(&mut arena, current, Props::new()).unwrap();

    assert_ne!(current, wip);
    assert_eq!(arena.get(current).unwrap().alternate, Some(wip));
    assert_eq!(arena.get(wip).unwrap().alternate, Some(current));
}

#[test]
fn second_pass_reuses_the_alternate_in_place() {
    let mut arena = FiberArena::new();
    let current = host_fiber(&mut arena, "div");
    let first = create_work_in_progress(&mut arena, current, Props::new()).unwrap();

    arena.get_mut(first).unwrap().flags |= EffectFlags::PLACEMENT;
    let next_props = Props::new().with("id", "x");
    let second = create_work_in_progress(&mut arena, current, next_props.clone()).unwrap();

    assert_eq!(first, second);
    assert_eq!(arena.get(second).unwrap().pending_props, next_props);
    assert!(arena.get(second).unwrap().flags.is_empty());
    assert_eq!(arena.len(), 2);
}

#[test]
fn work_in_progress_copies_current_fields() {
    let mut arena = FiberArena::new();
    let current = host_fiber(&mut arena, "div");
    let child = host_fiber(&mut arena, "span");
    let hook = Hook {
        state: Rc::new(RefCell::new(7i64)) as Rc<dyn Any>,
    };
    {
        let node = arena.get_mut(current).unwrap();
        node.child = Some(child);
        node.memoized_props = Some(Props::new().with("id", "x"));
        node.memoized_state = MemoizedState::Hooks(vec![hook]);
        node.update_queue = Some(text("payload"));
        node.host_binding = Some(42);
    }

    let wip = create_work_in_progress(&mut arena, current, Props::new()).unwrap();
    let node = arena.get(wip).unwrap();
    assert_eq!(node.child, Some(child));
    assert_eq!(node.memoized_props, Some(Props::new().with("id", "x")));
    assert!(matches!(&node.memoized_state, MemoizedState::Hooks(hooks) if hooks.len() == 1));
    assert_eq!(node.update_queue, Some(text("payload")));
    assert_eq!(node.host_binding, Some(42));
    assert_eq!(node.element_type, Some(TypeTag::Host("div".into())));
}

#[test]
fn text_descriptor_becomes_host_text_fiber() {
    let fiber = fiber_from_descriptor(&text("hello")).unwrap();
    assert_eq!(fiber.tag, WorkTag::HostText);
    assert_eq!(fiber.pending_props.text_content(), Some("hello"));
    assert!(fiber.element_type.is_none());
}

#[test]
fn host_descriptor_becomes_host_component_fiber() {
    let fiber = fiber_from_descriptor(&host("div", Props::new().with("id", "x"), [])).unwrap();
    assert_eq!(fiber.tag, WorkTag::HostComponent);
    assert_eq!(fiber.element_type, Some(TypeTag::Host("div".into())));
    assert!(fiber.pending_props.get("id").is_some());
}

#[test]
fn root_marker_in_child_position_is_rejected() {
    let malformed = Descriptor::Element(crate::element::Element {
        type_tag: TypeTag::Root,
        key: None,
        ref_name: None,
        props: Props::new(),
    });
    assert!(fiber_from_descriptor(&malformed).is_none());
}

#[test]
fn remove_subtree_frees_descendants_and_alternates() {
    let mut arena = FiberArena::new();
    let parent = host_fiber(&mut arena, "div");
    let first = host_fiber(&mut arena, "span");
    let second = host_fiber(&mut arena, "em");
    arena.get_mut(parent).unwrap().child = Some(first);
    arena.get_mut(first).unwrap().parent = Some(parent);
    arena.get_mut(first).unwrap().sibling = Some(second);
    arena.get_mut(second).unwrap().parent = Some(parent);

    let alternate = create_work_in_progress(&mut arena, first, Props::new()).unwrap();
    assert_eq!(arena.len(), 4);

    arena.remove_subtree(parent);
    assert_eq!(arena.len(), 0);
    assert!(!arena.contains(parent));
    assert!(!arena.contains(first));
    assert!(!arena.contains(second));
    assert!(!arena.contains(alternate));
}

#[test]
fn remove_subtree_tolerates_already_freed_ids() {
    let mut arena = FiberArena::new();
    let fiber = host_fiber(&mut arena, "div");
    arena.remove_subtree(fiber);
    arena.remove_subtree(fiber);
    assert!(arena.is_empty());
}

#[test]
fn arena_len_counts_live_slots_only() {
    let mut arena = FiberArena::new();
    let a = host_fiber(&mut arena, "div");
    let b = host_fiber(&mut arena, "span");
    assert_eq!(arena.len(), 2);
    arena.remove_subtree(a);
    assert_eq!(arena.len(), 1);
    assert!(arena.contains(b));
}

#[test]
fn dump_tree_renders_tags_and_text() {
    let mut arena = FiberArena::new();
    let parent = host_fiber(&mut arena, "div");
    let child = arena.create(fiber_from_descriptor(&text("hi")).unwrap());
    arena.get_mut(parent).unwrap().child = Some(child);
    arena.get_mut(child).unwrap().parent = Some(parent);

    let dump = arena.dump_tree(parent);
    assert!(dump.contains("<div>"));
    assert!(dump.contains("\"hi\""));
}

#[test]
fn new_fiber_starts_with_empty_work_state() {
    let fiber = FiberNode::new(WorkTag::HostRoot, Props::new(), None);
    assert!(fiber.flags.is_empty());
    assert!(fiber.memoized_props.is_none());
    assert!(matches!(fiber.memoized_state, MemoizedState::None));
    assert!(fiber.alternate.is_none());
    assert_eq!(fiber.index, 0);
}
