use std::collections::HashMap;
use std::sync::Arc;

use cp_core::error::AppError;

use crate::workflow::WorkflowHandler;

/// `{WorkflowName -> WorkflowHandler}`, populated once at startup. Looking
/// up a name nobody registered is a normal `NotFoundError`, never a panic.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    handlers: HashMap<String, Arc<dyn WorkflowHandler>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn WorkflowHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn WorkflowHandler>, AppError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("unknown workflow: {name}")))
    }
}
