//! Persona session workflow: the state machine behind the front-end.

pub mod controller;
pub mod log;
pub mod state;

pub use controller::{Confirm, FixedAnswer, Outcome, PersonaWorkflow};
pub use log::{BoundedLog, LOG_CAPACITY};
pub use state::{Avatar, InputTab, WorkflowState};
