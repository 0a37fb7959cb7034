//! Driving port for appending, deleting, reordering and listing modules.

use async_trait::async_trait;

use super::{ModuleAppended, ModuleRemoved};
use crate::domain::{CourseId, Error, Module, ModuleId, ModuleOrderEntry};

/// Request to append a module to the end of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendModuleRequest {
    /// Target course.
    pub course_id: CourseId,
    /// Untrimmed title as supplied.
    pub title: String,
}

/// Request to reassign every position of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderModulesRequest {
    /// Target course.
    pub course_id: CourseId,
    /// Complete mapping of module to new position.
    pub entries: Vec<ModuleOrderEntry>,
}

/// Driving port for the module sequencer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModuleSequencingCommand: Send + Sync {
    /// Append a module and provision progress rows for existing purchasers.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank title, `NotFound` for a missing course.
    async fn append_module(&self, request: AppendModuleRequest) -> Result<ModuleAppended, Error>;

    /// Delete a module and close the gap it leaves.
    async fn delete_module(&self, module_id: ModuleId) -> Result<ModuleRemoved, Error>;

    /// Reassign all positions of a course.
    ///
    /// # Errors
    ///
    /// Fails fast with `InvalidModuleId`, `InvalidOrder`, `DuplicateOrder`
    /// or `IncompleteReorder`; nothing is written on failure.
    async fn reorder_modules(&self, request: ReorderModulesRequest) -> Result<Vec<Module>, Error>;

    /// Modules of a course in position order.
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, Error>;
}
