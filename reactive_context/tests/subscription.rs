use reactive_context::{prelude::*, ContextError, Dynamic, Key};
use std::{cell::Cell, rc::Rc};

fn sum(cx: &Context) -> reactive_context::Subscription<i64> {
    cx.subscribe::<i64>(Computed::new(|cx| {
        Ok(cx.get::<i64>("a")? + cx.get::<i64>("b")?)
    }))
}

fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let callback = {
        let count = Rc::clone(&count);
        move || count.set(count.get() + 1)
    };
    (count, callback)
}

#[test]
fn subscriptions_evaluate_lazily() {
    let cx = Context::new();
    let calls = Rc::new(Cell::new(0));
    cx.set("a", 1).unwrap();
    let sub = cx.subscribe::<i64>(Computed::new({
        let calls = Rc::clone(&calls);
        move |cx: &dyn Scope| {
            calls.set(calls.get() + 1);
            cx.get::<i64>("a")
        }
    }));

    assert_eq!(calls.get(), 0);
    assert!(sub.is_stale());
    assert_eq!(sub.value().unwrap(), 1);
    assert_eq!(sub.value().unwrap(), 1);
    assert_eq!(calls.get(), 1);
    assert!(!sub.is_stale());
    assert!(sub.dependencies().contains(&Key::new("a")));
}

#[test]
fn subscriptions_are_notified_once_per_change() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();
    let sub = sum(&cx);
    let (notified, callback) = counter();
    sub.on_change(callback);

    assert_eq!(sub.value().unwrap(), 3);
    assert_eq!(notified.get(), 0);

    cx.set("a", 10).unwrap();
    assert_eq!(notified.get(), 1);
    assert!(sub.is_stale());

    cx.set("b", 20).unwrap();
    assert_eq!(notified.get(), 2);
    assert_eq!(sub.value().unwrap(), 30);

    cx.set("unrelated", 0).unwrap();
    assert_eq!(notified.get(), 2);
}

#[test]
fn subscriptions_see_transitive_changes() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? * 2)).unwrap();
    let sub = cx.subscribe::<i64>(Computed::new(|cx| cx.get::<i64>("b")));
    let (notified, callback) = counter();
    sub.on_change(callback);

    assert_eq!(sub.value().unwrap(), 2);
    cx.set("a", 4).unwrap();
    assert_eq!(notified.get(), 1);
    assert_eq!(sub.value().unwrap(), 8);
}

#[test]
fn one_write_recomputes_once_when_both_inputs_change() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? * 10)).unwrap();
    let calls = Rc::new(Cell::new(0));
    let sub = cx.subscribe::<i64>(Computed::new({
        let calls = Rc::clone(&calls);
        move |cx: &dyn Scope| {
            calls.set(calls.get() + 1);
            Ok(cx.get::<i64>("a")? + cx.get::<i64>("b")?)
        }
    }));
    let (notified, callback) = counter();
    sub.on_change(callback);

    assert_eq!(sub.value().unwrap(), 11);
    assert_eq!(calls.get(), 1);

    cx.set("a", 2).unwrap();
    assert_eq!(notified.get(), 1);
    assert_eq!(sub.value().unwrap(), 22);
    assert_eq!(sub.value().unwrap(), 22);
    assert_eq!(calls.get(), 2);
}

#[test]
fn disposed_subscriptions_are_silent() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();
    let sub = sum(&cx);
    let (notified, callback) = counter();
    sub.on_change(callback);
    sub.value().unwrap();

    cx.dispose(&sub);
    assert!(sub.is_disposed());
    cx.set("a", 5).unwrap();
    assert_eq!(notified.get(), 0);
    assert_eq!(sub.value(), Err(ContextError::DisposedAccess));

    // disposing twice is not an error
    sub.dispose();
}

#[test]
fn removed_listeners_are_not_called() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();
    let sub = sum(&cx);
    let (notified, callback) = counter();
    let id = sub.on_change(callback);
    sub.value().unwrap();

    assert!(sub.remove_listener(id));
    assert!(!sub.remove_listener(id));
    cx.set("a", 5).unwrap();
    assert_eq!(notified.get(), 0);
}

#[test]
fn the_context_does_not_keep_subscriptions_alive() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();

    let token = Rc::new(());
    let sub = sum(&cx);
    sub.on_change({
        let token = Rc::clone(&token);
        move || assert!(Rc::strong_count(&token) > 0)
    });
    sub.value().unwrap();
    assert_eq!(Rc::strong_count(&token), 2);

    drop(sub);
    assert_eq!(Rc::strong_count(&token), 1);

    // writing afterwards finds nothing to notify
    cx.set("a", 3).unwrap();
}

#[test]
fn clones_share_one_subscription() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();
    let sub = sum(&cx);
    let clone = sub.clone();
    let (notified, callback) = counter();
    sub.on_change(callback);

    drop(sub);
    clone.value().unwrap();
    cx.set("a", 2).unwrap();
    assert_eq!(notified.get(), 1);
    assert_eq!(clone.value().unwrap(), 4);
}

#[test]
fn stale_subscriptions_fail_once_the_context_is_gone() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();
    let sub = sum(&cx);
    sub.value().unwrap();

    cx.set("a", 2).unwrap();
    drop(cx);
    assert_eq!(sub.value(), Err(ContextError::DisposedAccess));
}

#[test]
fn subscriptions_coerce_to_their_type() {
    let cx = Context::new();
    cx.set("n", "42").unwrap();
    let n = cx.subscribe::<i64>(Computed::new(|cx| cx.get::<String>("n")));
    assert_eq!(n.value().unwrap(), 42);

    let raw = cx.subscribe::<Dynamic>(Literal::new("42"));
    assert_eq!(raw.value().unwrap(), Dynamic::from("42"));

    cx.set("n", "forty-two").unwrap();
    assert!(matches!(
        n.value(),
        Err(ContextError::TypeMismatch {
            found: Kind::Text,
            ..
        })
    ));
}

#[test]
fn child_subscriptions_follow_inherited_keys() {
    let root = Context::new();
    root.set("a", 1).unwrap();
    root.set("b", 2).unwrap();
    let child = root.child();
    let sub = sum(&child);
    let (notified, callback) = counter();
    sub.on_change(callback);
    assert_eq!(sub.value().unwrap(), 3);

    root.set("b", 5).unwrap();
    assert_eq!(notified.get(), 1);
    assert_eq!(sub.value().unwrap(), 6);

    // once the child shadows `b`, the root's writes no longer reach it
    child.set("b", 0).unwrap();
    assert_eq!(notified.get(), 2);
    assert_eq!(sub.value().unwrap(), 1);
    root.set("b", 100).unwrap();
    assert_eq!(notified.get(), 2);
}

#[test]
fn listeners_may_read_the_subscription() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set("b", 2).unwrap();
    let sub = sum(&cx);
    let seen = Rc::new(Cell::new(0));
    sub.on_change({
        let sub = sub.clone();
        let seen = Rc::clone(&seen);
        move || seen.set(sub.value().unwrap_or(-1))
    });
    sub.value().unwrap();

    cx.set("a", 40).unwrap();
    assert_eq!(seen.get(), 42);
    sub.dispose();
}
