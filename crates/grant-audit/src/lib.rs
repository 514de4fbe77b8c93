//! # grant-audit
//!
//! Audit capture for Grant-governed entities.
//!
//! - [`AuditRecorder`] captures create, update and destroy in two phases
//!   (`begin` before the transition, `commit` after it) and finds in one
//!   (`record`)
//! - [`AuditDeclaration`] selects the actions to capture, the change-set
//!   filter and an optional message
//! - [`AuditStore`] persists finished entries: [`MemoryStore`],
//!   [`FileStore`] (JSON Lines), [`ConsoleStore`] (human-readable lines) and
//!   [`NullStore`]
//!
//! Only transitions that reached `commit` are ever persisted.

pub mod declaration;
pub mod error;
pub mod filter;
pub mod recorder;
pub mod storage;

pub use declaration::{AuditDeclaration, MessageFn, message_fn, template_message};
pub use error::AuditError;
pub use filter::AuditFilter;
pub use recorder::AuditRecorder;
pub use storage::{AuditStore, ConsoleStore, FileStore, MemoryStore, NullStore, create_store};
