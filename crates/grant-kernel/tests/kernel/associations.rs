//! Relation add/remove checks.

use super::common::*;

use grant_core::{Entity, ExecutionContext, RuleToken, TokenValue};
use grant_policy::{DeniedKind, PermissionRequest, predicate};

fn labelled_policy() -> grant_kernel::EntityPolicy<Article> {
    let (mut policy, _store) = article_policy();
    policy
        .grant(
            vec![RuleToken::options([("add", TokenValue::from(vec!["labels", "editors"]))])],
            predicate(|req: &PermissionRequest<'_, Article>| req.actor.is_some()),
        )
        .unwrap();
    policy
        .grant(
            vec![RuleToken::options([("remove", "labels")])],
            predicate(|req: &PermissionRequest<'_, Article>| {
                req.actor_has_role("admin")
                    && req.associated.map(|a| a.id() != Some("1".to_string())).unwrap_or(false)
            }),
        )
        .unwrap();
    policy
}

#[test]
fn add_requires_a_matching_rule() {
    let policy = labelled_policy();
    let ctx = ExecutionContext::with_actor(author("2"));
    let article = Article::new("2").persisted(1);
    let label = Label { id: 5 };

    assert!(policy
        .before_association_add(&ctx, "labels", &article, &label)
        .is_ok());

    let err = policy
        .before_association_add(&ctx, "comments", &article, &label)
        .unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.kind, DeniedKind::Association);
    assert_eq!(denied.relation.as_deref(), Some("comments"));
    assert_eq!(denied.associated.as_deref(), Some("Label:5"));
}

#[test]
fn remove_sees_the_associated_entity() {
    let policy = labelled_policy();
    let ctx = ExecutionContext::with_actor(admin());
    let article = Article::new("2").persisted(1);

    assert!(policy
        .before_association_remove(&ctx, "labels", &article, &Label { id: 2 })
        .is_ok());
    let err = policy
        .before_association_remove(&ctx, "labels", &article, &Label { id: 1 })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "remove permission to labels:Label:1 association not granted to User:1 for resource Article:1"
    );
}

#[test]
fn association_checks_honour_bypass() {
    let policy = labelled_policy();
    let ctx = ExecutionContext::new();
    let article = Article::new("2").persisted(1);

    assert!(policy
        .before_association_remove(&ctx, "labels", &article, &Label { id: 1 })
        .is_err());
    ctx.without_enforcement(|| {
        assert!(policy
            .before_association_remove(&ctx, "labels", &article, &Label { id: 1 })
            .is_ok());
    });
}
