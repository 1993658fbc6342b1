//! NOC application review: forwarding to departments and districts, rejection, and the
//! operator's activity feed.

pub mod backend;
pub mod catalog;
pub mod domain;
pub mod feed;
pub mod forwarding;
pub mod lifecycle;
pub mod recipients;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use backend::{BackendError, NocBackend};
pub use catalog::{DepartmentGroup, Recipient, RecipientCatalog, RecipientKind};
pub use domain::{Application, ApplicationId, ApplicationStatus, Filmmaker};
pub use feed::{ActivityFeed, FeedFilter, Searchable, StatusFilter};
pub use forwarding::{ForwardingCoordinator, TransitionOutcome};
pub use lifecycle::{ApplicationStateMachine, Transition, TransitionRecord};
pub use recipients::{DepartmentTarget, DistrictTarget, ForwardPayload, RecipientSet};
pub use router::application_router;
pub use service::{NocReviewService, WorkflowError};
pub use validation::ValidationError;
