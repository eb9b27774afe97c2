//! Registration intake and draft-pool workflows.
//!
//! An athlete moves from a submitted registration into a team's draft pool,
//! and from there onto a roster (`drafted`) or out of the queue
//! (`declined`). The eligibility checker gates intake, the store owns the
//! waiting queue, the auto-draft policy snapshots the single-team shortcut,
//! and the orchestrator executes the terminal transitions.

pub(crate) mod autodraft;
pub mod domain;
pub mod eligibility;
pub mod orchestrator;
pub mod repository;
pub mod router;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    AthleteId, AthleteProfile, AthleteRegistrationStatus, DraftPoolEntry, EmergencyContact,
    EntryId, EntryStatus, EntryStatusView, EventListing, MedicalInfo, OrderId, PaymentMethod,
    PaymentStatus, PlayerId, RegistrationOrder, RosterPlayerRecord, TeamId, TeamSummary,
    UniformSizes, UserId,
};
pub use eligibility::{EligibilityChecker, EligibilityDecision};
pub use orchestrator::{DeclineCommand, DraftCommand, DraftOrchestrator};
pub use repository::{
    AthleteDirectory, DraftPoolRepository, Notification, NotificationError, NotificationKind,
    NotificationSink, RegistrationLedger, RepositoryError, TeamDirectory,
};
pub use router::registration_router;
pub use store::{DraftPoolError, DraftPoolStore, DraftPoolSubmission, PaymentPatch};
pub use workflow::{
    CompletedRegistration, PaymentError, RegistrationError, RegistrationForm, RegistrationOutcome,
    RegistrationService, RegistrationStep, RegistrationWorkflow, ValidationError,
};
