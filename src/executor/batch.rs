use tracing::warn;

use crate::command::{BatchFault, BatchOutcome, BatchRequest, BatchResult, Request, Response};
use crate::core::{Result, ServiceError};

use super::context::ExecutionContext;

/// Runs the batch items in order, capturing item failures as data. There is
/// no rollback: whatever completed before a stop stays applied.
///
/// Two failures stay fatal to the whole batch: a nested batch, and a
/// command the dispatcher does not implement. Neither is a property of the
/// data, so neither becomes a fault entry.
pub fn execute_batch(ctx: &ExecutionContext<'_>, batch: BatchRequest) -> Result<Response> {
    let mut outcomes = Vec::with_capacity(batch.requests.len());
    let mut faulted = false;

    for (index, request) in batch.requests.into_iter().enumerate() {
        if matches!(request, Request::ExecuteBatch(_)) {
            return Err(ServiceError::InvalidBatch(format!(
                "nested batch at index {index}"
            )));
        }
        let kind = request.kind();
        match super::execute(ctx, request) {
            Ok(response) => {
                outcomes.push(BatchOutcome::Completed(
                    batch.return_responses.then_some(response),
                ));
            }
            Err(error @ ServiceError::UnsupportedCommand(_)) => return Err(error),
            Err(error) => {
                warn!(index, kind, error = %error, "batch item faulted");
                faulted = true;
                outcomes.push(BatchOutcome::Faulted(BatchFault {
                    index,
                    message: error.to_string(),
                    detail: format!("while executing {kind}"),
                }));
                if !batch.continue_on_error {
                    break;
                }
            }
        }
    }

    Ok(Response::Batch(BatchResult { outcomes, faulted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;
    use crate::schema::{AttributeDescriptor, AttributeKind, EntityDescriptor, SchemaCatalog};
    use crate::store::{RecordStore, ServiceOptions};
    use uuid::Uuid;

    fn store() -> RecordStore {
        let catalog = SchemaCatalog::builder()
            .entity(
                EntityDescriptor::new("widget")
                    .attribute(AttributeDescriptor::new("name", AttributeKind::Text)),
            )
            .unwrap()
            .build();
        RecordStore::new(catalog)
    }

    fn five_creates_with_a_bad_third() -> Vec<Request> {
        (0..5)
            .map(|i| {
                if i == 2 {
                    // Deletes a record that does not exist.
                    Request::Delete {
                        entity: "widget".to_string(),
                        id: Uuid::new_v4(),
                    }
                } else {
                    Request::Create(Record::new("widget").with("name", format!("w{i}")))
                }
            })
            .collect()
    }

    #[test]
    fn stop_on_first_fault_leaves_later_items_unexecuted() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let batch = BatchRequest::new(five_creates_with_a_bad_third());
        let Response::Batch(result) = execute_batch(&ctx, batch).unwrap() else {
            panic!("expected a batch result");
        };

        assert!(result.faulted);
        assert_eq!(result.len(), 3);
        assert!(result.outcomes[2].is_fault());
        assert_eq!(result.faults()[0].index, 2);
        // Items 1 and 2 completed and stay applied.
        assert_eq!(store.len("widget"), 2);
    }

    #[test]
    fn continue_on_error_runs_every_item() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let batch = BatchRequest::new(five_creates_with_a_bad_third()).continue_on_error(true);
        let Response::Batch(result) = execute_batch(&ctx, batch).unwrap() else {
            panic!("expected a batch result");
        };

        assert!(result.faulted);
        assert_eq!(result.len(), 5);
        assert_eq!(result.faults().len(), 1);
        assert_eq!(result.faults()[0].index, 2);
        assert_eq!(store.len("widget"), 4);
    }

    #[test]
    fn responses_are_recorded_only_on_request() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let requests = vec![Request::Create(Record::new("widget"))];
        let batch = BatchRequest::new(requests.clone()).return_responses(false);
        let Response::Batch(result) = execute_batch(&ctx, batch).unwrap() else {
            panic!("expected a batch result");
        };
        assert_eq!(result.len(), 1);
        assert!(result.responses().is_empty());

        let Response::Batch(result) = execute_batch(&ctx, BatchRequest::new(requests)).unwrap()
        else {
            panic!("expected a batch result");
        };
        assert!(matches!(result.responses()[0], Response::Created(_)));
    }

    #[test]
    fn nested_batches_are_fatal() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let inner = BatchRequest::new(vec![Request::Create(Record::new("widget"))]);
        let batch = BatchRequest::new(vec![
            Request::Create(Record::new("widget")),
            Request::ExecuteBatch(inner),
        ]);

        let err = execute_batch(&ctx, batch).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBatch(_)));
        // The create before the nested batch already happened.
        assert_eq!(store.len("widget"), 1);
    }

    #[test]
    fn unsupported_commands_stay_fatal_even_with_continue_on_error() {
        let store = store();
        let options = ServiceOptions::new();
        let ctx = ExecutionContext::new(&store, &options);

        let batch = BatchRequest::new(vec![
            Request::Create(Record::new("widget")),
            Request::Custom {
                name: "bespoke".to_string(),
                parameters: Default::default(),
            },
            Request::Create(Record::new("widget")),
        ])
        .continue_on_error(true);

        let err = execute_batch(&ctx, batch).unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedCommand(_)));
        assert_eq!(store.len("widget"), 1);
    }
}
