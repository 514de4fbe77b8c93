//! # grant-kernel
//!
//! Declarative authorization and audit for domain entities.
//!
//! A host builds one [`EntityPolicy`] per entity type, either in code or
//! from a YAML declaration file through a [`PolicyRegistry`], and calls its
//! extension points around every lifecycle transition. Each unit of work
//! carries its own [`ExecutionContext`](grant_core::ExecutionContext).
//!
//! ```
//! use std::sync::Arc;
//!
//! use grant_audit::MemoryStore;
//! use grant_core::{Actor, Entity, ExecutionContext};
//! use grant_kernel::EntityPolicy;
//! use grant_policy::{PermissionRequest, predicate};
//!
//! struct Post { id: Option<String> }
//!
//! impl Entity for Post {
//!     fn entity_type(&self) -> &str { "Post" }
//!     fn id(&self) -> Option<String> { self.id.clone() }
//! }
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut posts = EntityPolicy::<Post>::new("Post", store.clone());
//! posts
//!     .grant(["create"], predicate(|req: &PermissionRequest<'_, Post>| req.actor_has_role("admin")))
//!     .unwrap();
//! posts.audit_on(["create"], None).unwrap();
//!
//! let ctx = ExecutionContext::with_actor(Actor::new("User", "1").with_role("admin"));
//! posts.before_create(&ctx, &Post { id: None }).unwrap();
//! posts.after_create(&ctx, &Post { id: Some("10".to_string()) }).unwrap();
//! assert_eq!(store.len(), 1);
//! ```

pub mod error;
pub mod policy;
pub mod registry;

pub use error::GrantError;
pub use policy::EntityPolicy;
pub use registry::{PolicyRegistry, PredicateRegistry};
