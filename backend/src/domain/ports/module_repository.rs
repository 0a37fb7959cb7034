//! Driven port for module sequencing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{CourseId, Module, ModuleId, NewModule, ReorderPlan, ReorderRejection};

define_port_error! {
    /// Errors raised by module persistence adapters.
    pub enum ModuleRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "module repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "module repository query failed: {message}",
        /// The course does not exist.
        CourseNotFound { course_id: CourseId } => "course {course_id} not found",
        /// The module does not exist.
        ModuleNotFound { module_id: ModuleId } => "module {module_id} not found",
        /// Re-validation against the locked module set refused the reorder.
        Rejected { rejection: ReorderRejection } => "reorder rejected: {rejection}",
        /// A position constraint was violated by a concurrent writer.
        PositionConflict { message: String } => "module position conflict: {message}",
    }
}

/// A module appended to the end of its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAppended {
    /// The stored module.
    pub module: Module,
    /// Progress rows created for existing purchasers.
    pub provisioned: usize,
}

/// A module removed from its course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRemoved {
    /// Removed module.
    pub module_id: ModuleId,
    /// Course it belonged to.
    pub course_id: CourseId,
    /// Modules moved down to close the gap.
    pub shifted: usize,
}

/// Port for ordered module storage.
///
/// Every mutation locks the owning course row exclusively for the duration of
/// its transaction so appends, deletes and reorders on one course serialise,
/// and so purchases (which hold the same row in shared mode) observe either
/// all or none of a module change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Modules of a course in position order.
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, ModuleRepositoryError>;

    /// Insert at `max(position) + 1` and provision a progress row for every
    /// current purchaser, stamped `provisioned_at`.
    async fn append_module(
        &self,
        module: &NewModule,
        provisioned_at: DateTime<Utc>,
    ) -> Result<ModuleAppended, ModuleRepositoryError>;

    /// Delete a module and shift later modules down by one.
    async fn delete_module(&self, module_id: ModuleId)
    -> Result<ModuleRemoved, ModuleRepositoryError>;

    /// Validate the plan against the locked modules and apply it in two
    /// passes, returning the modules in their new order.
    async fn reorder_modules(
        &self,
        course_id: CourseId,
        plan: &ReorderPlan,
    ) -> Result<Vec<Module>, ModuleRepositoryError>;
}
