//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! stored values and report violations as query failures.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Certificate, CertificateId, Course, CourseId, Module, ModuleId, ModulePosition, Money, UserId,
};

use super::schema::{certificates, courses, module_progress, modules, purchases};

/// Row struct for reading from the courses table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: i64,
    pub title: String,
    pub instructor: String,
    pub price: i64,
}

impl TryFrom<CourseRow> for Course {
    type Error = String;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CourseId::new(row.id),
            price: stored_money("courses.price", row.price)?,
            title: row.title,
            instructor: row.instructor,
        })
    }
}

/// Row struct for reading from the modules table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ModuleRow {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub position: i32,
}

impl TryFrom<ModuleRow> for Module {
    type Error = String;

    fn try_from(row: ModuleRow) -> Result<Self, Self::Error> {
        let position = ModulePosition::new(row.position)
            .map_err(|err| format!("module {} has invalid stored position: {err}", row.id))?;
        Ok(Self {
            id: ModuleId::new(row.id),
            course_id: CourseId::new(row.course_id),
            title: row.title,
            position,
        })
    }
}

/// Insertable struct for appending a module.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = modules)]
pub(crate) struct NewModuleRow<'a> {
    pub course_id: i64,
    pub title: &'a str,
    pub position: i32,
}

/// Insertable struct for purchase records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = purchases)]
pub(crate) struct NewPurchaseRow {
    pub user_id: Uuid,
    pub course_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for provisioned progress rows.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = module_progress)]
pub(crate) struct NewModuleProgressRow {
    pub user_id: Uuid,
    pub module_id: i64,
    pub is_completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the certificates table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = certificates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CertificateRow {
    pub id: i64,
    pub user_id: Uuid,
    pub course_id: i64,
    pub file_url: String,
    pub issued_at: DateTime<Utc>,
}

impl From<CertificateRow> for Certificate {
    fn from(row: CertificateRow) -> Self {
        Self {
            id: CertificateId::new(row.id),
            user_id: UserId::from_uuid(row.user_id),
            course_id: CourseId::new(row.course_id),
            file_url: row.file_url,
            issued_at: row.issued_at,
        }
    }
}

/// Insertable struct for certificate records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = certificates)]
pub(crate) struct NewCertificateRow<'a> {
    pub user_id: Uuid,
    pub course_id: i64,
    pub file_url: &'a str,
    pub issued_at: DateTime<Utc>,
}

/// Validate a stored monetary column.
pub(crate) fn stored_money(column: &str, minor_units: i64) -> Result<Money, String> {
    Money::from_minor_units(minor_units)
        .map_err(|err| format!("stored {column} is invalid ({minor_units}): {err}"))
}

/// Convert module rows, failing on the first invalid row.
pub(crate) fn modules_from_rows(rows: Vec<ModuleRow>) -> Result<Vec<Module>, String> {
    rows.into_iter().map(Module::try_from).collect()
}
