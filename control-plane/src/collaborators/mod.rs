pub mod runtime_allocator;
pub mod workflow_handler;

pub use runtime_allocator::HttpRuntimeAllocator;
pub use workflow_handler::HttpWorkflowHandler;
