//! Module ordering rules.
//!
//! Positions within a course always form the dense permutation `1..=N`. The
//! store enforces uniqueness on `(course_id, position)` at statement level, so
//! every renumber is expressed as a [`RenumberPlan`] applied in two passes:
//! each moving module is first parked on a unique negative staging value, then
//! written to its target.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Error, Module, ModuleId, ModulePosition};

/// One entry of a reorder request: move `module_id` to `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOrderEntry {
    /// Module to move.
    pub module_id: ModuleId,
    /// Requested one-based position; validated against the course.
    pub position: i32,
}

/// Why a reorder request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderRejection {
    /// An entry names a module outside the course.
    #[error("module {module_id} does not belong to the course")]
    UnknownModule {
        /// Offending module.
        module_id: ModuleId,
    },
    /// An entry targets a position outside `1..=max`.
    #[error("position {position} for module {module_id} is outside 1..={max}")]
    PositionOutOfRange {
        /// Offending module.
        module_id: ModuleId,
        /// Requested position.
        position: i32,
        /// Module count of the course.
        max: usize,
    },
    /// Two entries target the same position.
    #[error("position {position} is assigned more than once")]
    DuplicatePosition {
        /// Contested position.
        position: i32,
    },
    /// The request does not name every module exactly once.
    #[error("reorder names {supplied} of {expected} modules")]
    Incomplete {
        /// Module count of the course.
        expected: usize,
        /// Distinct modules named by the request.
        supplied: usize,
    },
}

impl From<ReorderRejection> for Error {
    fn from(value: ReorderRejection) -> Self {
        let message = value.to_string();
        match value {
            ReorderRejection::UnknownModule { module_id } => {
                Error::invalid_module_id(message).with_details(json!({ "moduleId": module_id }))
            }
            ReorderRejection::PositionOutOfRange {
                module_id,
                position,
                max,
            } => Error::invalid_order(message).with_details(json!({
                "moduleId": module_id,
                "position": position,
                "max": max,
            })),
            ReorderRejection::DuplicatePosition { position } => {
                Error::duplicate_order(message).with_details(json!({ "position": position }))
            }
            ReorderRejection::Incomplete { expected, supplied } => Error::incomplete_reorder(
                message,
            )
            .with_details(json!({ "expected": expected, "supplied": supplied })),
        }
    }
}

/// A reorder request awaiting validation against a course's modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    entries: Vec<ModuleOrderEntry>,
}

impl ReorderPlan {
    /// Wrap the requested entries. An empty request can never be complete.
    pub fn new(entries: Vec<ModuleOrderEntry>) -> Result<Self, ReorderRejection> {
        if entries.is_empty() {
            return Err(ReorderRejection::Incomplete {
                expected: 0,
                supplied: 0,
            });
        }
        Ok(Self { entries })
    }

    /// Requested entries in request order.
    pub fn entries(&self) -> &[ModuleOrderEntry] {
        &self.entries
    }

    /// Validate against the course's current modules and derive the moves.
    ///
    /// Checks run entry by entry, failing fast: ownership, then range, then
    /// duplicate positions. Completeness is checked once every entry passed.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{
    ///     CourseId, Module, ModuleId, ModuleOrderEntry, ModulePosition, ReorderPlan,
    /// };
    ///
    /// let modules: Vec<Module> = (1..=3)
    ///     .map(|raw| Module {
    ///         id: ModuleId::new(raw),
    ///         course_id: CourseId::new(1),
    ///         title: format!("Module {raw}"),
    ///         position: ModulePosition::new(raw as i32).expect("positive"),
    ///     })
    ///     .collect();
    /// let plan = ReorderPlan::new(vec![
    ///     ModuleOrderEntry { module_id: ModuleId::new(1), position: 3 },
    ///     ModuleOrderEntry { module_id: ModuleId::new(2), position: 1 },
    ///     ModuleOrderEntry { module_id: ModuleId::new(3), position: 2 },
    /// ])
    /// .expect("non-empty");
    /// let renumber = plan.validate(&modules).expect("valid reorder");
    /// assert_eq!(renumber.moves().len(), 3);
    /// ```
    pub fn validate(&self, current: &[Module]) -> Result<RenumberPlan, ReorderRejection> {
        let known: BTreeSet<ModuleId> = current.iter().map(|module| module.id).collect();
        let max = current.len();
        let mut taken: BTreeSet<i32> = BTreeSet::new();
        let mut assignments: BTreeMap<ModuleId, ModulePosition> = BTreeMap::new();

        for entry in &self.entries {
            if !known.contains(&entry.module_id) {
                return Err(ReorderRejection::UnknownModule {
                    module_id: entry.module_id,
                });
            }
            let in_range = usize::try_from(entry.position).is_ok_and(|raw| (1..=max).contains(&raw));
            let position = ModulePosition::new(entry.position)
                .ok()
                .filter(|_| in_range)
                .ok_or(ReorderRejection::PositionOutOfRange {
                    module_id: entry.module_id,
                    position: entry.position,
                    max,
                })?;
            if !taken.insert(entry.position) {
                return Err(ReorderRejection::DuplicatePosition {
                    position: entry.position,
                });
            }
            assignments.insert(entry.module_id, position);
        }

        if assignments.len() != max {
            return Err(ReorderRejection::Incomplete {
                expected: max,
                supplied: assignments.len(),
            });
        }

        Ok(RenumberPlan::from_assignments(current, assignments))
    }
}

/// A single module relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionMove {
    /// Module being moved.
    pub module_id: ModuleId,
    /// Negative value held between the two passes. Unique within the plan.
    pub staging: i32,
    /// Final position.
    pub target: ModulePosition,
}

/// Position changes for one course, applied in two passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenumberPlan {
    moves: Vec<PositionMove>,
}

impl RenumberPlan {
    fn from_assignments(
        current: &[Module],
        assignments: impl IntoIterator<Item = (ModuleId, ModulePosition)>,
    ) -> Self {
        let existing: HashMap<ModuleId, ModulePosition> = current
            .iter()
            .map(|module| (module.id, module.position))
            .collect();
        let changed = assignments
            .into_iter()
            .filter(|(module_id, target)| existing.get(module_id) != Some(target));
        Self::with_staging(changed)
    }

    fn with_staging(changes: impl Iterator<Item = (ModuleId, ModulePosition)>) -> Self {
        let moves = changes
            .zip(1_i32..)
            .map(|((module_id, target), slot)| PositionMove {
                module_id,
                staging: -slot,
                target,
            })
            .collect();
        Self { moves }
    }

    /// Close the gap left by a deleted module.
    ///
    /// `remaining` holds the course's modules after the delete, in any order.
    /// Every module is moved to its rank by current position, so the result is
    /// `1..=N` even if the input already had other gaps.
    pub fn after_removal(remaining: &[Module]) -> Self {
        let mut ordered: Vec<&Module> = remaining.iter().collect();
        ordered.sort_by_key(|module| module.position);
        let assignments = ordered
            .iter()
            .zip(1_i32..)
            .filter_map(|(module, rank)| {
                ModulePosition::new(rank)
                    .ok()
                    .map(|target| (module.id, target))
            });
        Self::from_assignments(remaining, assignments)
    }

    /// Moves to apply; unchanged modules are omitted.
    pub fn moves(&self) -> &[PositionMove] {
        &self.moves
    }

    /// Whether the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Apply the plan to an in-memory module list, returning it in position
    /// order.
    pub fn apply(&self, modules: Vec<Module>) -> Vec<Module> {
        let targets: HashMap<ModuleId, ModulePosition> = self
            .moves
            .iter()
            .map(|step| (step.module_id, step.target))
            .collect();
        let mut applied: Vec<Module> = modules
            .into_iter()
            .map(|mut module| {
                if let Some(target) = targets.get(&module.id) {
                    module.position = *target;
                }
                module
            })
            .collect();
        applied.sort_by_key(|module| module.position);
        applied
    }
}

/// Position for a module appended after the current maximum.
pub fn next_position(current_max: Option<ModulePosition>) -> Option<ModulePosition> {
    match current_max {
        None => Some(ModulePosition::FIRST),
        Some(max) => max.next(),
    }
}

/// Whether the modules' positions are exactly `1..=N`.
pub fn positions_are_dense(modules: &[Module]) -> bool {
    let positions: BTreeSet<i32> = modules.iter().map(|module| module.position.get()).collect();
    positions.len() == modules.len() && positions.into_iter().eq(1..=to_i32(modules.len()))
}

fn to_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}
