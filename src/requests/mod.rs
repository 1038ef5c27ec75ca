pub mod kind;
pub mod service;
pub mod validation;

pub use kind::{find_by_slug, RequestKind, KINDS};
pub use service::{LifecycleService, Submission};
