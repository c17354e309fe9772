use crate::store::{RecordStore, ServiceOptions};

/// Shared state handed to every request handler.
pub struct ExecutionContext<'a> {
    pub store: &'a RecordStore,
    pub options: &'a ServiceOptions,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(store: &'a RecordStore, options: &'a ServiceOptions) -> Self {
        Self { store, options }
    }
}
