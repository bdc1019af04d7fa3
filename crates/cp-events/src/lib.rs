pub mod bus;
pub mod event;

pub use bus::{ActivityEventBus, ActivityStreamItem, ActivitySubscription};
pub use event::{ActivityEvent, ActivityStatus};
