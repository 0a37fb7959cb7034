//! Domain primitives, consistency policies and services.
//!
//! Purpose: own the rules that keep purchases, progress rows, module order
//! and certificates consistent. Policies here are pure; persistence adapters
//! call them from inside their transactions so every decision is made against
//! locked rows.
//!
//! Public surface:
//! - Value types: [`Money`], identifiers, [`ModulePosition`].
//! - Policies: [`EnrolmentSnapshot`], [`ProvisioningPlan`], [`ReorderPlan`],
//!   [`RenumberPlan`], [`CourseProgress`].
//! - Services: [`EnrolmentService`], [`ModuleSequencingService`],
//!   [`ProgressService`], [`CertificateIssuer`].
//! - [`ports`]: driving and driven traits at the hexagon edge.

pub mod certificate;
mod certificate_issuer;
pub mod course;
pub mod enrolment;
mod enrolment_service;
pub mod error;
pub mod identifiers;
pub mod money;
pub mod ports;
pub mod progress;
mod progress_service;
pub mod provisioning;
pub mod sequencing;
mod sequencing_service;
#[cfg(test)]
mod test_clock;

pub use self::certificate::{
    ArtifactKey, Certificate, CertificateDetails, CertificateIssuance, CertificateSubject,
    MissingCertificateField, NewCertificate, RenderedArtifact,
};
pub use self::certificate_issuer::CertificateIssuer;
pub use self::course::{
    Course, InvalidPosition, MODULE_TITLE_MAX, Module, ModulePosition, NewModule, NewModuleError,
};
pub use self::enrolment::{
    BalanceStatement, Debit, EnrolmentDenial, EnrolmentSnapshot, PurchaseReceipt,
};
pub use self::enrolment_service::EnrolmentService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identifiers::{
    CertificateId, CourseId, IdentifierError, ModuleId, PurchaseId, UserId,
};
pub use self::money::{Money, MoneyError};
pub use self::progress::{
    CompletionChange, CourseProgress, EnrolledCourse, ModuleCompletionOutcome, ModuleProgress,
    ProgressCounts,
};
pub use self::progress_service::ProgressService;
pub use self::provisioning::{PROVISION_CHUNK_SIZE, ProgressSeed, ProvisioningPlan};
pub use self::sequencing::{
    ModuleOrderEntry, PositionMove, RenumberPlan, ReorderPlan, ReorderRejection, next_position,
    positions_are_dense,
};
pub use self::sequencing_service::ModuleSequencingService;
