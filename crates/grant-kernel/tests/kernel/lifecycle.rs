//! Lifecycle round trips through the extension points.

use super::common::*;

use std::sync::Arc;

use grant_audit::{AuditError, AuditFilter, AuditStore, template_message};
use grant_core::{Action, AuditEntry, ExecutionContext, RuleToken, TokenValue};
use grant_kernel::{EntityPolicy, GrantError};
use grant_policy::{DeniedKind, GrantQuery, PermissionRequest, predicate};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// ACTIONS
// =============================================================================

#[test]
fn admin_may_create_member_may_not() {
    let (policy, _store) = article_policy();
    let article = Article::new("2").change("title", json!(null), json!("Hello"));

    let ctx = ExecutionContext::with_actor(admin());
    assert!(policy.before_create(&ctx, &article).is_ok());
    ctx.reset();

    ctx.set_actor(Some(author("2")));
    let err = policy.before_create(&ctx, &article).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.kind, DeniedKind::Action);
    assert_eq!(denied.action, "create");
    assert_eq!(
        err.to_string(),
        "create permission not granted to User:2 for resource Article:new"
    );
}

#[test]
fn unauthenticated_update_is_denied() {
    let (policy, _store) = article_policy();
    let article = Article::new("2").persisted(5);
    let ctx = ExecutionContext::new();

    let err = policy.before_update(&ctx, &article).unwrap_err();
    assert_eq!(err.as_denied().unwrap().actor, "anonymous");
}

#[test]
fn find_is_checked_after_load() {
    let (mut policy, store) = article_policy();
    policy.audit_on(["find"], None).unwrap();
    let ctx = ExecutionContext::with_actor(author("9"));
    let article = Article::new("2").persisted(5);

    let entry = policy.after_find(&ctx, &article).unwrap().unwrap();
    assert_eq!(entry.action, Action::Find);
    assert!(entry.success);
    assert!(entry.changes.is_none());
    assert_eq!(entry.subject_version, Some(1));
    assert_eq!(store.len(), 1);
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

#[test]
fn author_may_not_publish() {
    let (policy, _store) = article_policy();
    let article = Article::new("2")
        .persisted(5)
        .change("title", json!("a"), json!("b"))
        .change("published", json!(false), json!(true))
        .change("slug", json!("a"), json!("b"));

    let ctx = ExecutionContext::with_actor(author("2"));
    let err = policy.before_update(&ctx, &article).unwrap_err();
    let denied = err.as_denied().unwrap();
    assert_eq!(denied.kind, DeniedKind::Attributes);
    assert_eq!(denied.attributes, vec!["published", "slug"]);
    assert!(!ctx.has_in_flight("Article"));

    ctx.set_actor(Some(admin()));
    let err = policy.before_update(&ctx, &article).unwrap_err();
    assert_eq!(err.as_denied().unwrap().attributes, vec!["slug"]);
}

#[test]
fn granted_reports_current_actor_view() {
    let (policy, _store) = article_policy();
    let ctx = ExecutionContext::with_actor(author("2"));
    let article = Article::new("2").persisted(1);

    let granted = policy.granted(&ctx, &article, &GrantQuery::new(), true);
    assert_eq!(granted.actions, vec![Action::Find, Action::Update]);
    assert_eq!(granted.attributes, vec!["author_id", "body", "title"]);

    let query = GrantQuery::new().attributes(["published", "title"]);
    let denied = policy.granted(&ctx, &article, &query, false);
    assert_eq!(denied.attributes, vec!["published"]);
}

// =============================================================================
// AUDIT PAIRING
// =============================================================================

#[test]
fn update_audit_is_committed_once_with_filtered_changes() {
    let (mut policy, store) = article_policy();
    policy
        .audit_on(
            vec![
                RuleToken::from("update"),
                RuleToken::options([("only", TokenValue::from("title"))]),
            ],
            Some(template_message(Action::Update, "{actor} edited {subject}")),
        )
        .unwrap();

    let ctx = ExecutionContext::with_actor(author("2"));
    let article = Article::new("2")
        .persisted(7)
        .change("title", json!("a"), json!("b"))
        .change("body", json!("x"), json!("y"));

    policy.before_update(&ctx, &article).unwrap();
    let saved = article.persisted(7);
    let entry = policy.after_update(&ctx, &saved).unwrap().unwrap();

    assert!(entry.success);
    assert_eq!(entry.subject_id, "7");
    assert_eq!(entry.subject_version, Some(2));
    assert_eq!(entry.message.as_deref(), Some("User:2 edited Article:7"));
    let changes = entry.changes.unwrap();
    assert_eq!(changes.keys().collect::<Vec<_>>(), vec!["title"]);
    assert_eq!(changes["title"].new, json!("b"));

    assert!(policy.after_update(&ctx, &saved).unwrap().is_none());
    let stored = store
        .query(&AuditFilter::for_subject("Article", "7"))
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn failed_transition_leaves_no_entry() {
    let (mut policy, store) = article_policy();
    policy.audit_on(["destroy"], None).unwrap();
    let ctx = ExecutionContext::with_actor(admin());
    let article = Article::new("2").persisted(3);

    policy.before_destroy(&ctx, &article).unwrap();
    assert!(ctx.has_in_flight("Article"));
    // the host's delete failed here
    policy.abandon(&ctx);

    assert!(policy.after_destroy(&ctx, &article).unwrap().is_none());
    assert!(store.is_empty());
}

#[test]
fn store_failures_propagate() {
    struct FailingStore;

    impl AuditStore for FailingStore {
        fn save(&self, _entry: AuditEntry) -> Result<(), AuditError> {
            Err(AuditError::StorageError("disk full".to_string()))
        }

        fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
            Ok(vec![])
        }

        fn get(&self, _entry_id: Uuid) -> Result<Option<AuditEntry>, AuditError> {
            Ok(None)
        }
    }

    let mut policy = EntityPolicy::<Article>::new("Article", Arc::new(FailingStore));
    policy
        .grant(["create"], predicate(|_: &PermissionRequest<'_, Article>| true))
        .unwrap();
    policy.audit_on(["create"], None).unwrap();

    let ctx = ExecutionContext::with_actor(admin());
    policy.before_create(&ctx, &Article::new("1")).unwrap();
    let err = policy
        .after_create(&ctx, &Article::new("1").persisted(4))
        .unwrap_err();
    assert!(matches!(err, GrantError::Audit(AuditError::StorageError(_))));
    assert!(!ctx.has_in_flight("Article"));
}
