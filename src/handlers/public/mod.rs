pub mod login;
pub mod service;

pub use login::{login_requester, login_reviewer};
pub use service::{health, root};
