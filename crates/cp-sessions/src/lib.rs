pub mod error;
pub mod manager;
pub mod reaper;
pub mod runtime;
pub mod session;
pub mod warmup;

pub use manager::SessionManager;
pub use runtime::{AllocationError, RuntimeAllocator};
pub use session::{Session, SessionStatus};
pub use warmup::retry_during_warmup;
