//! Rule registries and default-deny permission evaluation.
//!
//! Each entity type owns one [`PermissionEvaluator`]. Grants bind a
//! [`Predicate`] to the actions, attributes and associations of a
//! [`RuleSpec`](grant_core::RuleSpec); anything without a satisfied rule is
//! denied with a [`PermissionDenied`].
//!
//! ```
//! use grant_core::{Action, Actor, Entity, ExecutionContext, RuleSpec};
//! use grant_policy::{PermissionEvaluator, PermissionRequest, predicate};
//!
//! struct Post;
//!
//! impl Entity for Post {
//!     fn entity_type(&self) -> &str { "Post" }
//!     fn id(&self) -> Option<String> { Some("1".to_string()) }
//! }
//!
//! let mut evaluator = PermissionEvaluator::<Post>::new("Post");
//! evaluator.register(
//!     &RuleSpec::parse(["create"]).unwrap(),
//!     predicate(|req: &PermissionRequest<'_, Post>| req.actor_has_role("admin")),
//! ).unwrap();
//!
//! let ctx = ExecutionContext::with_actor(Actor::new("User", "7"));
//! let err = evaluator.check_action(&ctx, Action::Create, &Post).unwrap_err();
//! assert_eq!(err.action, "create");
//! ```

pub mod error;
pub mod evaluator;
pub mod grants;
pub mod request;
pub mod rule;

pub use error::{DeniedKind, PermissionDenied};
pub use evaluator::PermissionEvaluator;
pub use grants::{GrantQuery, GrantReport};
pub use request::PermissionRequest;
pub use rule::{Predicate, Rule, RuleTarget, predicate};
