//! Two-pass application of a [`RenumberPlan`].
//!
//! `UNIQUE (course_id, position)` is checked per row, so a direct swap would
//! collide. Every moving module is parked on its negative staging value first,
//! then written to its target. Must run under the course row lock.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::{CourseId, RenumberPlan};

use super::schema::modules;

/// Apply `plan` to the modules of `course_id` and return the rows touched by
/// the final pass.
pub(crate) async fn apply_renumber(
    conn: &mut AsyncPgConnection,
    course_id: CourseId,
    plan: &RenumberPlan,
) -> QueryResult<usize> {
    for step in plan.moves() {
        diesel::update(
            modules::table
                .filter(modules::id.eq(step.module_id.get()))
                .filter(modules::course_id.eq(course_id.get())),
        )
        .set(modules::position.eq(step.staging))
        .execute(conn)
        .await?;
    }

    let mut written = 0;
    for step in plan.moves() {
        written += diesel::update(
            modules::table
                .filter(modules::id.eq(step.module_id.get()))
                .filter(modules::course_id.eq(course_id.get())),
        )
        .set(modules::position.eq(step.target.get()))
        .execute(conn)
        .await?;
    }
    Ok(written)
}
