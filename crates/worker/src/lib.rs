//! Render job coordination.
//!
//! Prepares a per-user working directory with the config document and the
//! track file, runs the external renderer in a detached task and resolves
//! its outcome through the filesystem: the video or an empty `error` marker
//! next to the working directory, which is always removed afterwards.

pub mod coordinator;
pub mod events;
pub mod layout;
pub mod runner;
pub mod status;

pub use coordinator::{CoordinatorConfig, PreparedJob, RenderCoordinator, Submission};
pub use events::{JobEvent, JobOutcome};
pub use status::JobStatus;
