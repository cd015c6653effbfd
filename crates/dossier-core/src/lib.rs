//! Onboarding domain rules with no I/O: which documents are required, how
//! completion turns into progress, which lifecycle transitions are legal and
//! what an acceptable upload looks like.

pub mod intake;
pub mod lifecycle;
pub mod progress;
pub mod registry;

pub use intake::{IntakeError, UploadPolicy};
pub use lifecycle::TransitionError;
pub use progress::Progress;
pub use registry::{RequirementDef, RequirementRegistry};
