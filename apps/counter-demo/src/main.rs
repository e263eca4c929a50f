//! Counter demo: a function component with one state slot, re-rendered from
//! an externally held setter, printed through the in-memory host.

use std::cell::RefCell;

use weft_core::{component, host_element, text, use_state, Descriptor, Props, Reconciler, SetState};

thread_local! {
    static SET_N: RefCell<Option<SetState<i64>>> = const { RefCell::new(None) };
}

fn app(_props: &Props) -> Descriptor {
    let (n, set_n) = use_state(|| 100i64);
    SET_N.with(|slot| *slot.borrow_mut() = Some(set_n));
    if n == 3 {
        component(child, Props::new())
    } else {
        host_element("div", Props::new(), [text(n.to_string())])
    }
}

fn child(_props: &Props) -> Descriptor {
    host_element("h1", Props::new(), [text("hello weft")])
}

fn main() {
    env_logger::init();

    let (reconciler, host) = Reconciler::with_memory_host();
    let container = host.borrow_mut().create_container();
    let root = reconciler.mount(component(app, Props::new()), container);

    println!("after mount:");
    print!("{}", host.borrow().dump_tree(container));
    println!("fiber tree:");
    print!("{}", reconciler.dump_root(root));

    let set_n = SET_N.with(|slot| slot.borrow().clone()).expect("setter captured");
    set_n.set(3);

    println!("\nafter set(3):");
    print!("{}", host.borrow().dump_tree(container));
    println!("fiber tree:");
    print!("{}", reconciler.dump_root(root));
}
