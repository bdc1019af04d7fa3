pub mod bridge;
pub mod error;
pub mod frame;

pub use bridge::ExtensionBridge;
pub use error::BridgeError;
pub use frame::{InboundFrame, OutboundFrame};
