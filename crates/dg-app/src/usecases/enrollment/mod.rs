//! Enrollment use cases.
//!
//! This module exposes the enrollment orchestrator and its navigation queue.

mod context;
mod error;
mod navigation_queue;
pub mod orchestrator;

pub use context::EnrollmentContext;
pub use error::{step_error_from, EnrollmentError};
pub use navigation_queue::NavigationQueue;
pub use orchestrator::{DeadlineGuard, EnrollmentDeps, EnrollmentOrchestrator};
