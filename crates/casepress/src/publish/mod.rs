//! Publishing: validation, retrying single publishes, batch runs, queue
//! planning, and remote status sync.

pub mod batch;
pub mod error;
pub mod publisher;
pub mod queue;
pub mod sync;
pub mod validator;

pub use batch::BatchCoordinator;
pub use error::{PublishError, SyncError};
pub use publisher::{RetryPolicy, RetryingPublisher, Sleeper, ThreadSleeper};
pub use queue::{QueuePlan, QueuedArtifact};
pub use sync::StatusSynchronizer;
pub use validator::{validate, ValidationError, ValidationLimits};
