//! Per-context state: actors, bypass scopes and in-flight entries never leak
//! between units of work.

use super::common::*;

use std::sync::Arc;
use std::thread;

use grant_audit::{MemoryStore, message_fn};
use grant_core::{Action, ExecutionContext};
use grant_kernel::EntityPolicy;
use grant_policy::GrantQuery;
use serde_json::json;

#[test]
fn concurrent_contexts_do_not_share_actors_or_bypass() {
    let (mut policy, store) = article_policy();
    policy.audit_on(["create"], None).unwrap();
    let policy = Arc::new(policy);

    thread::scope(|scope| {
        let bypassing = {
            let policy = Arc::clone(&policy);
            scope.spawn(move || {
                let ctx = ExecutionContext::new();
                ctx.without_enforcement(|| {
                    policy.before_create(&ctx, &Article::new("1")).is_ok()
                })
            })
        };
        let enforcing = {
            let policy = Arc::clone(&policy);
            scope.spawn(move || {
                let ctx = ExecutionContext::with_actor(author("2"));
                policy.before_create(&ctx, &Article::new("2")).is_err()
            })
        };
        assert!(bypassing.join().unwrap());
        assert!(enforcing.join().unwrap());
    });

    assert!(store.is_empty());
}

#[test]
fn in_flight_entries_belong_to_their_context() {
    let (mut policy, store) = article_policy();
    policy.audit_on(["update"], None).unwrap();

    let first = ExecutionContext::with_actor(admin());
    let second = ExecutionContext::with_actor(admin());
    let article = Article::new("1")
        .persisted(3)
        .change("title", json!("a"), json!("b"));

    policy.before_update(&first, &article).unwrap();
    assert!(first.has_in_flight("Article"));
    assert!(!second.has_in_flight("Article"));

    assert!(policy.after_update(&second, &article).unwrap().is_none());
    assert!(policy.after_update(&first, &article).unwrap().is_some());
    assert_eq!(store.len(), 1);
}

#[test]
fn type_scoped_audit_bypass_still_enforces() {
    let (mut policy, store) = article_policy();
    policy.audit_on(["update"], None).unwrap();
    let ctx = ExecutionContext::with_actor(author("9"));
    let article = Article::new("2").persisted(1);

    policy.without_audit(&ctx, || {
        assert!(policy.before_update(&ctx, &article).is_err());
        ctx.set_actor(Some(admin()));
        policy.before_update(&ctx, &article).unwrap();
        policy.after_update(&ctx, &article).unwrap();
    });
    assert!(store.is_empty());
}

#[test]
fn helper_context_starts_disabled() {
    let (policy, _store) = article_policy();
    let ctx = ExecutionContext::disabled();
    let article = Article::new("1").change("published", json!(false), json!(true));

    assert!(policy.before_create(&ctx, &article).is_ok());
    let denied = policy.granted(&ctx, &article, &GrantQuery::new(), false);
    assert!(denied.actions.is_empty());

    ctx.reset();
    assert!(!policy.is_granted(&ctx, Action::Create, &article));
}

#[test]
fn message_fn_may_load_other_entities_unchecked() {
    let label_store = Arc::new(MemoryStore::new());
    let mut labels = EntityPolicy::<Label>::new("Label", label_store.clone());
    labels.audit_on(["find"], None).unwrap();
    let labels = Arc::new(labels);

    let (mut policy, store) = article_policy();
    let lookup = Arc::clone(&labels);
    policy
        .audit_on(
            ["update"],
            Some(message_fn(move |ctx: &ExecutionContext, _: &Article, _| {
                match lookup.after_find(ctx, &Label { id: 5 }) {
                    Ok(_) => "labelled Label:5".to_string(),
                    Err(err) => err.to_string(),
                }
            })),
        )
        .unwrap();

    let ctx = ExecutionContext::with_actor(author("2"));
    let article = Article::new("2").persisted(3).change("title", json!("a"), json!("b"));
    policy.before_update(&ctx, &article).unwrap();
    let entry = policy.after_update(&ctx, &article).unwrap().unwrap();
    assert_eq!(entry.message.as_deref(), Some("labelled Label:5"));
    assert_eq!(store.len(), 1);
    assert!(label_store.is_empty());

    let err = labels.after_find(&ctx, &Label { id: 5 }).unwrap_err();
    assert!(err.is_denied());
    assert!(label_store.is_empty());
}
