//! Policies built from YAML declaration files.

use super::common::*;

use std::io::Write;

use grant_audit::{AuditFilter, AuditStore};
use grant_core::{Action, ExecutionContext};
use grant_kernel::{GrantError, PolicyRegistry, PredicateRegistry};
use grant_policy::{PermissionRequest, predicate};
use serde_json::json;

const DECLARATIONS: &str = r#"
audit:
  enabled: true
  storage:
    backend: memory
entities:
  Article:
    attributes: [title, body, author_id, published]
    grants:
      - rule: [":create", DESTROY]
        when: is_admin
      - rule: [update]
        when: is_author
      - rule: [read]
        when: always
      - rule: [{add: [labels]}]
        when: authenticated
    attribute_grants:
      - rule: [title, body, author_id]
        when: always
      - rule: [published]
        when: is_admin
    audits:
      - actions: [create, update]
        except: [body]
        message: "{actor} {action} {subject_type}"
      - actions: [find]
"#;

fn predicates() -> PredicateRegistry<Article> {
    PredicateRegistry::new()
        .with(
            "is_admin",
            predicate(|req: &PermissionRequest<'_, Article>| req.actor_has_role("admin")),
        )
        .with(
            "is_author",
            predicate(|req: &PermissionRequest<'_, Article>| {
                req.actor_id() == Some(req.subject.author_id.as_str())
            }),
        )
}

#[test]
fn yaml_declarations_drive_the_whole_lifecycle() {
    let registry = PolicyRegistry::from_yaml(DECLARATIONS).unwrap();
    let policy = registry.build("Article", &predicates()).unwrap();
    let ctx = ExecutionContext::with_actor(admin());

    let draft = Article::new("1")
        .change("title", json!(null), json!("Hi"))
        .change("body", json!(null), json!("..."));
    policy.before_create(&ctx, &draft).unwrap();
    let saved = draft.persisted(40);
    let created = policy.after_create(&ctx, &saved).unwrap().unwrap();
    assert_eq!(created.message.as_deref(), Some("User:1 create Article"));
    assert_eq!(
        created.changes.unwrap().keys().collect::<Vec<_>>(),
        vec!["title"]
    );

    policy.after_find(&ctx, &saved).unwrap();

    let stored = registry
        .store()
        .query(&AuditFilter::for_subject("Article", "40"))
        .unwrap();
    assert_eq!(
        stored.iter().map(|e| e.action).collect::<Vec<_>>(),
        vec![Action::Create, Action::Find]
    );
}

#[test]
fn yaml_attribute_grants_apply_per_attribute() {
    let registry = PolicyRegistry::from_yaml(DECLARATIONS).unwrap();
    let policy = registry.build("Article", &predicates()).unwrap();
    let ctx = ExecutionContext::with_actor(author("2"));

    let article = Article::new("2")
        .persisted(8)
        .change("title", json!("a"), json!("b"));
    assert!(policy.before_update(&ctx, &article).is_ok());
    policy.abandon(&ctx);

    let article = article.change("published", json!(false), json!(true));
    let err = policy.before_update(&ctx, &article).unwrap_err();
    assert_eq!(err.as_denied().unwrap().attributes, vec!["published"]);

    assert!(policy.is_granted(&ctx, Action::Find, &article));
    assert!(!policy.is_granted(&ctx, Action::Destroy, &article));
}

#[test]
fn unknown_attribute_in_declaration_fails_to_load() {
    let yaml = r#"
entities:
  Article:
    attributes: [title]
    attribute_grants:
      - rule: [subtitle]
        when: always
"#;
    let err = PolicyRegistry::from_yaml(yaml).err().unwrap();
    assert!(matches!(err, GrantError::Config(_)));
    assert!(err.to_string().contains("unknown attribute(s): subtitle"));
}

#[test]
fn attribute_grant_with_except_fails_to_load() {
    let yaml = r#"
entities:
  Article:
    attributes: [title, published]
    attribute_grants:
      - rule: [published]
        when: is_admin
      - rule: [{attributes: all, except: [published]}]
        when: always
"#;
    let err = PolicyRegistry::from_yaml(yaml).err().unwrap();
    assert!(matches!(err, GrantError::Config(_)));
    assert!(err.to_string().contains(":only and :except"));
}

#[test]
fn declarations_load_from_file_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.jsonl");
    let yaml = format!(
        r#"
audit:
  storage:
    backend: file
    file_path: "{}"
entities:
  Article:
    grants:
      - rule: [find]
        when: always
    audits:
      - actions: [find]
"#,
        log.display()
    );
    let path = dir.path().join("grants.yaml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(yaml.as_bytes())
        .unwrap();

    let registry = PolicyRegistry::from_file(&path).unwrap();
    let policy = registry
        .build("Article", &PredicateRegistry::<Article>::new()).unwrap();
    let ctx = ExecutionContext::new();
    policy
        .after_find(&ctx, &Article::new("1").persisted(2))
        .unwrap();

    let content = std::fs::read_to_string(&log).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"actor_type\":\"anonymous\""));
}

#[test]
fn disabled_audit_config_records_nothing() {
    let yaml = DECLARATIONS.replace("enabled: true", "enabled: false");
    let registry = PolicyRegistry::from_yaml(&yaml).unwrap();
    let policy = registry.build("Article", &predicates()).unwrap();
    let ctx = ExecutionContext::with_actor(admin());

    assert!(policy
        .after_find(&ctx, &Article::new("1").persisted(2))
        .unwrap()
        .is_none());
    assert!(registry
        .store()
        .query(&AuditFilter::default())
        .unwrap()
        .is_empty());
}
