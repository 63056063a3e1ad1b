pub mod audit_event;
pub mod facility;
pub mod submission;

pub use audit_event::AuditEvent;
pub use facility::Facility;
pub use submission::{Submission, SubmissionStatus};
