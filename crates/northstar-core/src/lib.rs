pub mod access;
pub mod error;
pub mod invocation;
pub mod limits;
pub mod memory;
pub mod notebook;
pub mod notebooks;
pub mod permission;
pub mod reconcile;
pub mod schedule;
pub mod scheduler;
pub mod transformation;
pub mod transformations;
pub mod user;

pub use access::{AccessQuery, AccessRecord, AccessStore};
pub use error::{NorthstarError, Result, StoreError};
pub use invocation::{CellResults, Invocation, InvocationStore, Output, OutputStatus};
pub use limits::ExecutionLimits;
pub use notebook::{Cell, Notebook, NotebookStore, StoredNotebook};
pub use notebooks::NotebookService;
pub use permission::{Capability, Permission};
pub use schedule::{Event, Schedule, DEVICE_EVENT, TIMER_EVENT};
pub use scheduler::{Scheduler, SchedulerRegistry};
pub use transformation::{Code, CodeType, EventType, Snippet, SnippetStore, Transformation};
pub use transformations::TransformationService;
pub use user::User;
