use reactive_context::{
    prelude::*, ContextError, DeletePolicy, Key, Result,
};
use std::{cell::Cell, rc::Rc};

fn counted(
    calls: &Rc<Cell<usize>>,
    fun: impl Fn(&dyn Scope) -> Result<i64> + 'static,
) -> Computed {
    let calls = Rc::clone(calls);
    Computed::new(move |cx: &dyn Scope| {
        calls.set(calls.get() + 1);
        fun(cx)
    })
}

#[test]
fn literal_reads_after_write() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    assert_eq!(cx.get::<i64>("a").unwrap(), 1);

    cx.set("a", "one").unwrap();
    assert_eq!(cx.get::<String>("a").unwrap(), "one");
}

#[test]
fn computed_runs_once_between_invalidations() {
    let cx = Context::new();
    let calls = Rc::new(Cell::new(0));
    cx.set("a", 1).unwrap();
    cx.set("b", counted(&calls, |cx| Ok(cx.get::<i64>("a")? + 1)))
        .unwrap();

    assert_eq!(cx.get::<i64>("b").unwrap(), 2);
    assert_eq!(cx.get::<i64>("b").unwrap(), 2);
    assert_eq!(cx.get::<i64>("b").unwrap(), 2);
    assert_eq!(calls.get(), 1);

    cx.set("unrelated", true).unwrap();
    assert_eq!(cx.get::<i64>("b").unwrap(), 2);
    assert_eq!(calls.get(), 1);
}

#[test]
fn writes_propagate_to_dependents() {
    let cx = Context::new();
    let calls = Rc::new(Cell::new(0));
    cx.set("b", counted(&calls, |cx| Ok(cx.get::<i64>("a")? * 2)))
        .unwrap();

    cx.set("a", 5).unwrap();
    assert_eq!(cx.get::<i64>("b").unwrap(), 10);
    assert_eq!(calls.get(), 1);

    cx.set("a", 7).unwrap();
    assert!(!cx.is_cached("b"));
    assert_eq!(cx.get::<i64>("b").unwrap(), 14);
    assert_eq!(calls.get(), 2);
}

#[test]
fn invalidation_is_transitive() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? + 1)).unwrap();
    cx.set_computed("c", |cx| Ok(cx.get::<i64>("b")? + 1)).unwrap();
    assert_eq!(cx.get::<i64>("c").unwrap(), 3);

    cx.set("a", 10).unwrap();
    assert!(!cx.is_cached("b"));
    assert!(!cx.is_cached("c"));
    assert_eq!(cx.get::<i64>("c").unwrap(), 12);
}

#[test]
fn dependencies_follow_the_latest_branch() {
    let cx = Context::new();
    cx.set("flag", true).unwrap();
    cx.set("yes", 1).unwrap();
    cx.set("no", 2).unwrap();
    cx.set_computed("pick", |cx| {
        if cx.get::<bool>("flag")? {
            cx.get::<i64>("yes")
        } else {
            cx.get::<i64>("no")
        }
    })
    .unwrap();

    assert_eq!(cx.get::<i64>("pick").unwrap(), 1);
    let deps = cx.dependencies("pick").unwrap();
    assert!(deps.contains(&Key::new("yes")));
    assert!(!deps.contains(&Key::new("no")));

    cx.set("flag", false).unwrap();
    assert_eq!(cx.get::<i64>("pick").unwrap(), 2);

    // `yes` is no longer read, so writing it leaves the cache alone
    cx.set("yes", 100).unwrap();
    assert!(cx.is_cached("pick"));
}

#[test]
fn a_miss_read_with_try_get_is_still_a_dependency() {
    let cx = Context::new();
    cx.set_computed("greeting", |cx| {
        let name = cx.get_or("name", String::from("world"))?;
        Ok(format!("hello {name}"))
    })
    .unwrap();
    assert_eq!(cx.get::<String>("greeting").unwrap(), "hello world");

    cx.set("name", "there").unwrap();
    assert_eq!(cx.get::<String>("greeting").unwrap(), "hello there");
}

#[test]
fn self_recursion_is_rejected() {
    let cx = Context::new();
    cx.set_computed("x", |cx| Ok(cx.get::<i64>("x")? + 1)).unwrap();

    assert_eq!(
        cx.get::<i64>("x"),
        Err(ContextError::RecursiveEvaluation(Key::new("x")))
    );
    assert!(!cx.is_cached("x"));
    // the failed evaluation leaves nothing behind, so it fails the same way
    assert_eq!(
        cx.get::<i64>("x"),
        Err(ContextError::RecursiveEvaluation(Key::new("x")))
    );
    // `try_get` does not swallow recursion
    assert!(cx.try_get::<i64>("x").is_err());
}

#[test]
fn mutual_recursion_is_rejected() {
    let cx = Context::new();
    cx.set_computed("a", |cx| Ok(cx.get::<i64>("b")? + 1)).unwrap();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? + 1)).unwrap();

    assert!(matches!(
        cx.get::<i64>("a"),
        Err(ContextError::RecursiveEvaluation(_))
    ));
    assert!(!cx.is_cached("a"));
    assert!(!cx.is_cached("b"));

    // breaking the cycle makes both readable
    cx.set("b", 1).unwrap();
    assert_eq!(cx.get::<i64>("a").unwrap(), 2);
}

#[test]
fn failed_evaluations_commit_nothing() {
    let cx = Context::new();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? * 2)).unwrap();

    assert_eq!(
        cx.get::<i64>("b"),
        Err(ContextError::KeyNotFound(Key::new("a")))
    );
    assert!(!cx.is_cached("b"));
    assert!(cx.dependencies("b").is_none());

    cx.set("a", 2).unwrap();
    assert_eq!(cx.get::<i64>("b").unwrap(), 4);
}

#[test]
fn keys_are_normalized() {
    let cx = Context::new();
    cx.set("a.b", 1).unwrap();
    assert_eq!(cx.get::<i64>("a/b").unwrap(), 1);
    assert!(cx.has_own("a/b"));

    cx.set("c/d", 2).unwrap();
    assert_eq!(cx.get::<i64>("c.d").unwrap(), 2);
}

#[test]
fn type_mismatches() {
    let cx = Context::new();
    cx.set("n", 5).unwrap();

    assert!(matches!(
        cx.get::<String>("n"),
        Err(ContextError::TypeMismatch {
            found: Kind::Int,
            ..
        })
    ));
    assert_eq!(cx.try_get::<String>("n").unwrap(), None);
    assert_eq!(cx.try_get::<i64>("n").unwrap(), Some(5));
    assert_eq!(cx.try_get::<i64>("missing").unwrap(), None);
    assert_eq!(
        cx.get::<i64>("missing"),
        Err(ContextError::KeyNotFound(Key::new("missing")))
    );
}

#[test]
fn value_errors_surface_unchanged() {
    let cx = Context::new();
    cx.set_computed("broken", |_| -> Result<i64> {
        Err(ContextError::custom("nope"))
    })
    .unwrap();

    assert_eq!(cx.get::<i64>("broken"), Err(ContextError::custom("nope")));
    assert_eq!(cx.try_get::<i64>("broken").unwrap(), None);
}

#[test]
fn empty_keys_are_invalid() {
    let cx = Context::new();
    assert!(matches!(
        cx.set("", 1),
        Err(ContextError::InvalidArgument(_))
    ));
    assert!(!cx.has_own(""));
    assert!(matches!(
        cx.refresh(""),
        Err(ContextError::InvalidArgument(_))
    ));
}

#[test]
fn refresh_invalidates_without_writing() {
    let cx = Context::new();
    let calls = Rc::new(Cell::new(0));
    cx.set("a", 1).unwrap();
    cx.set("b", counted(&calls, |cx| cx.get::<i64>("a"))).unwrap();
    cx.get::<i64>("b").unwrap();

    cx.refresh("a").unwrap();
    assert!(!cx.is_cached("b"));
    cx.get::<i64>("b").unwrap();
    assert_eq!(calls.get(), 2);

    // refreshing a key nothing owns is fine
    cx.refresh("nobody").unwrap();
}

#[test]
fn own_values_lists_enumerable_entries_in_order() {
    let cx = Context::new();
    cx.set("z", 1).unwrap();
    cx.set_hidden("hidden", 2).unwrap();
    cx.set_computed("computed", |_| Ok(3)).unwrap();
    cx.set("a", 4).unwrap();

    let keys = cx
        .own_values()
        .into_iter()
        .map(|(key, _)| key)
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![Key::new("z"), Key::new("a")]);

    assert!(cx.has_enumerable("z"));
    assert!(!cx.has_enumerable("hidden"));
    assert!(!cx.has_enumerable("computed"));
    assert!(cx.has("hidden"));
    assert_eq!(cx.get::<i64>("computed").unwrap(), 3);
}

#[test]
fn deleting_a_key_invalidates_dependents() {
    let cx = Context::new();
    cx.set("a", 1).unwrap();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? + 1)).unwrap();
    assert_eq!(cx.get::<i64>("b").unwrap(), 2);

    assert_eq!(cx.delete_own("a"), Ok(true));
    assert_eq!(cx.delete_own("a"), Ok(false));
    assert!(!cx.has("a"));
    assert_eq!(
        cx.get::<i64>("b"),
        Err(ContextError::KeyNotFound(Key::new("a")))
    );
}

#[test]
fn strict_delete_policy_rejects_keys_with_dependents() {
    let cx =
        Context::new().with_delete_policy(DeletePolicy::RejectDependents);
    cx.set("a", 1).unwrap();
    cx.set_computed("b", |cx| Ok(cx.get::<i64>("a")? + 1)).unwrap();
    cx.get::<i64>("b").unwrap();

    assert_eq!(
        cx.delete_own("a"),
        Err(ContextError::DependentsExist {
            key: Key::new("a"),
            dependents: vec![Key::new("b")],
            subscriptions: 0,
        })
    );
    assert!(cx.has_own("a"));
    assert!(cx.is_cached("b"));

    assert_eq!(cx.delete_own("b"), Ok(true));
    assert_eq!(cx.delete_own("a"), Ok(true));
}

#[test]
fn strict_delete_policy_counts_live_subscriptions() {
    let cx =
        Context::new().with_delete_policy(DeletePolicy::RejectDependents);
    cx.set("a", 1).unwrap();
    let sub = cx.subscribe::<i64>(Computed::new(|cx| cx.get::<i64>("a")));
    assert_eq!(sub.value().unwrap(), 1);

    assert!(matches!(
        cx.delete_own("a"),
        Err(ContextError::DependentsExist {
            subscriptions: 1,
            ..
        })
    ));

    drop(sub);
    assert_eq!(cx.delete_own("a"), Ok(true));
}

#[test]
fn rate_and_double_across_scopes() {
    let root = Context::new();
    root.set("rate", 2).unwrap();
    root.set_computed("double", |cx| Ok(cx.get::<i64>("rate")? * 2))
        .unwrap();

    let child = Context::child_of(&root);
    assert_eq!(child.get::<i64>("double").unwrap(), 4);
    assert!(child.is_cached("double"));
    assert!(!root.is_cached("double"));

    root.set("rate", 3).unwrap();
    assert!(!child.is_cached("double"));
    assert_eq!(child.get::<i64>("double").unwrap(), 6);
    assert_eq!(root.get::<i64>("double").unwrap(), 6);
}

#[test]
fn inherited_computations_see_the_reading_scope() {
    let root = Context::new();
    root.set("rate", 2).unwrap();
    root.set_computed("double", |cx| Ok(cx.get::<i64>("rate")? * 2))
        .unwrap();

    let child = root.child();
    child.set("rate", 10).unwrap();
    assert_eq!(root.get::<i64>("double").unwrap(), 4);
    assert_eq!(child.get::<i64>("double").unwrap(), 20);

    // the child shadows `rate`, so the root's write does not reach it
    root.set("rate", 3).unwrap();
    assert!(child.is_cached("double"));
    assert_eq!(child.get::<i64>("double").unwrap(), 20);
    assert_eq!(root.get::<i64>("double").unwrap(), 6);
}
