// Domain layer modules
pub mod change_event;
pub mod collections;
pub mod pipeline;
pub mod source_id;
pub mod task_id;

// Re-exports
pub use change_event::{ChangeEvent, DocumentKey, OperationType};
pub use collections::CollectionNames;
pub use pipeline::{FieldTransform, ID_FIELD, Pipeline, Stage};
pub use source_id::SourceId;
pub use task_id::TaskId;
