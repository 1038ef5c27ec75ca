pub mod institution;
pub mod principal;
pub mod request;

pub use institution::Institution;
pub use principal::{Requester, Reviewer};
pub use request::{AttachmentRefs, FieldValues, ServiceRequest, StatusBucket};
