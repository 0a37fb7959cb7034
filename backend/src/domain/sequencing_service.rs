//! Module sequencer service.
//!
//! Requests are validated against a fresh read of the course before any write
//! so malformed reorders fail without opening a write transaction. The
//! repository validates again under the course lock.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    AppendModuleRequest, ModuleAppended, ModuleRemoved, ModuleRepository, ModuleRepositoryError,
    ModuleSequencingCommand, ReorderModulesRequest,
};
use crate::domain::{CourseId, Error, Module, ModuleId, NewModule, ReorderPlan};

/// Service implementing [`ModuleSequencingCommand`].
#[derive(Clone)]
pub struct ModuleSequencingService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> ModuleSequencingService<R> {
    /// Create the service over a module repository.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

#[async_trait]
impl<R> ModuleSequencingCommand for ModuleSequencingService<R>
where
    R: ModuleRepository,
{
    async fn append_module(&self, request: AppendModuleRequest) -> Result<ModuleAppended, Error> {
        let module = NewModule::new(request.course_id, &request.title)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let appended = self
            .repo
            .append_module(&module, self.clock.utc())
            .await
            .map_err(map_module_error)?;

        info!(
            course_id = %appended.module.course_id,
            module_id = %appended.module.id,
            position = %appended.module.position,
            provisioned = appended.provisioned,
            "module appended"
        );
        Ok(appended)
    }

    async fn delete_module(&self, module_id: ModuleId) -> Result<ModuleRemoved, Error> {
        let removed = self
            .repo
            .delete_module(module_id)
            .await
            .map_err(map_module_error)?;

        info!(
            %module_id,
            course_id = %removed.course_id,
            shifted = removed.shifted,
            "module deleted"
        );
        Ok(removed)
    }

    async fn reorder_modules(&self, request: ReorderModulesRequest) -> Result<Vec<Module>, Error> {
        let ReorderModulesRequest { course_id, entries } = request;
        let plan = ReorderPlan::new(entries)?;

        let current = self
            .repo
            .list_modules(course_id)
            .await
            .map_err(map_module_error)?;
        let preview = plan.validate(&current)?;
        if preview.is_empty() {
            return Ok(current);
        }

        let reordered = self
            .repo
            .reorder_modules(course_id, &plan)
            .await
            .map_err(map_module_error)?;

        info!(%course_id, moved = preview.moves().len(), "modules reordered");
        Ok(reordered)
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, Error> {
        self.repo
            .list_modules(course_id)
            .await
            .map_err(map_module_error)
    }
}

fn map_module_error(error: ModuleRepositoryError) -> Error {
    match error {
        ModuleRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("module repository unavailable: {message}"))
        }
        ModuleRepositoryError::Query { message } => {
            Error::internal(format!("module repository error: {message}"))
        }
        ModuleRepositoryError::CourseNotFound { course_id } => {
            Error::not_found(format!("course {course_id} not found"))
                .with_details(json!({ "courseId": course_id }))
        }
        ModuleRepositoryError::ModuleNotFound { module_id } => {
            Error::not_found(format!("module {module_id} not found"))
                .with_details(json!({ "moduleId": module_id }))
        }
        ModuleRepositoryError::Rejected { rejection } => rejection.into(),
        ModuleRepositoryError::PositionConflict { message } => {
            Error::store_conflict(format!("module positions changed concurrently: {message}"))
        }
    }
}

#[cfg(test)]
#[path = "sequencing_service_tests.rs"]
mod tests;
