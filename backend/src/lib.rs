//! Academy backend: enrolment, module sequencing, progress and certificates.

pub mod domain;
pub mod outbound;
pub mod settings;
pub mod wiring;
