pub mod controller;
pub mod error;
pub mod record;
pub mod registry;
pub mod workflow;

pub use controller::RunController;
pub use record::{CancelFlag, RunRecord};
pub use registry::WorkflowRegistry;
pub use workflow::{EventStream, RunStrategy, StreamMode, WorkflowError, WorkflowEvent, WorkflowHandler};
