// Infrastructure layer modules
pub mod change_stream;
pub mod config;
pub mod database;
pub mod logging;
pub mod mongo_database;

// Re-exports
pub use change_stream::{SourceChangeStream, StreamItem};
pub use config::{MongoConfig, MongoConfigError};
pub use database::{DatabaseError, DeleteResult, PipelineResult, TaskDatabase};
pub use logging::init_logging;
pub use mongo_database::MongoTaskDatabase;
