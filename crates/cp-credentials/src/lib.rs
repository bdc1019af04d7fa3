pub mod cookies;
pub mod key;
pub mod store;

pub use cookies::{Cookie, CookieSet};
pub use store::CredentialStore;
