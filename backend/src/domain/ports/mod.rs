//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are implemented by domain services and
//! called by inbound adapters. Driven ports (`*Repository`, renderer, artifact
//! store) are implemented by outbound adapters and return strongly typed
//! errors so services map failures into predictable domain codes.

mod macros;
pub(crate) use macros::define_port_error;

mod artifact_store;
mod certificate_renderer;
mod certificate_repository;
mod enrolment_command;
mod enrolment_repository;
mod module_repository;
mod module_sequencing_command;
mod progress_command;
mod progress_query;
mod progress_repository;

#[cfg(test)]
pub use artifact_store::MockArtifactStore;
pub use artifact_store::{ArtifactStore, ArtifactStoreError};
#[cfg(test)]
pub use certificate_renderer::MockCertificateRenderer;
pub use certificate_renderer::{CertificateRenderError, CertificateRenderer};
#[cfg(test)]
pub use certificate_repository::MockCertificateRepository;
pub use certificate_repository::{CertificateRepository, CertificateRepositoryError};
#[cfg(test)]
pub use enrolment_command::MockEnrolmentCommand;
pub use enrolment_command::{BuyCourseRequest, EnrolmentCommand, TopUpBalanceRequest};
#[cfg(test)]
pub use enrolment_repository::MockEnrolmentRepository;
pub use enrolment_repository::{EnrolmentRepository, EnrolmentRepositoryError};
#[cfg(test)]
pub use module_repository::MockModuleRepository;
pub use module_repository::{
    ModuleAppended, ModuleRemoved, ModuleRepository, ModuleRepositoryError,
};
#[cfg(test)]
pub use module_sequencing_command::MockModuleSequencingCommand;
pub use module_sequencing_command::{
    AppendModuleRequest, ModuleSequencingCommand, ReorderModulesRequest,
};
#[cfg(test)]
pub use progress_command::MockProgressCommand;
pub use progress_command::{ProgressCommand, SetModuleCompletionRequest};
#[cfg(test)]
pub use progress_query::MockProgressQuery;
pub use progress_query::ProgressQuery;
#[cfg(test)]
pub use progress_repository::MockProgressRepository;
pub use progress_repository::{ProgressRepository, ProgressRepositoryError};
