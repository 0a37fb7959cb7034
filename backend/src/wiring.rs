//! Builds the academy service graph.
//!
//! [`AcademyServices::from_pool`] wires the Diesel repositories, the SVG
//! renderer and the filesystem artifact store behind the driving ports.

use std::io;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::domain::ports::{
    EnrolmentCommand, ModuleSequencingCommand, ProgressCommand, ProgressQuery,
};
use crate::domain::{CertificateIssuer, EnrolmentService, ModuleSequencingService, ProgressService};
use crate::outbound::artifacts::FilesystemArtifactStore;
use crate::outbound::persistence::{
    DbPool, DieselCertificateRepository, DieselEnrolmentRepository, DieselModuleRepository,
    DieselProgressRepository,
};
use crate::outbound::rendering::SvgCertificateRenderer;
use crate::settings::AcademySettings;

/// Driving ports exposed to inbound adapters.
#[derive(Clone)]
pub struct AcademyServices {
    /// Purchases, top-ups and purchase status.
    pub enrolment: Arc<dyn EnrolmentCommand>,
    /// Module append, delete, reorder and listing.
    pub sequencing: Arc<dyn ModuleSequencingCommand>,
    /// Completion toggles, certificate claims and repair passes.
    pub progress: Arc<dyn ProgressCommand>,
    /// Progress and certificate reads.
    pub progress_query: Arc<dyn ProgressQuery>,
}

impl AcademyServices {
    /// Wire database-backed services.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the certificate directory cannot be created.
    pub fn from_pool(pool: &DbPool, settings: &AcademySettings) -> io::Result<Self> {
        let artifacts =
            FilesystemArtifactStore::open(settings.certificate_dir(), settings.public_base_url())?;
        Ok(Self::with_clock(pool, artifacts, Arc::new(DefaultClock)))
    }

    /// Wire database-backed services with an explicit artifact store and
    /// clock.
    pub fn with_clock(
        pool: &DbPool,
        artifacts: FilesystemArtifactStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let issuer = CertificateIssuer::new(
            Arc::new(DieselCertificateRepository::new(pool.clone())),
            Arc::new(SvgCertificateRenderer::new()),
            Arc::new(artifacts),
            Arc::clone(&clock),
        );
        let progress = Arc::new(ProgressService::new(
            Arc::new(DieselProgressRepository::new(pool.clone())),
            issuer,
            Arc::clone(&clock),
        ));

        Self {
            enrolment: Arc::new(EnrolmentService::new(
                Arc::new(DieselEnrolmentRepository::new(pool.clone())),
                Arc::clone(&clock),
            )),
            sequencing: Arc::new(ModuleSequencingService::new(
                Arc::new(DieselModuleRepository::new(pool.clone())),
                clock,
            )),
            progress: Arc::clone(&progress) as Arc<dyn ProgressCommand>,
            progress_query: progress,
        }
    }
}

