//! Progress provisioning: every purchaser owns one progress row per module of
//! the purchased course.
//!
//! A [`ProvisioningPlan`] names which side of the purchaser × module product
//! changed. Adapters expand it into [`ProgressSeed`]s and insert them with
//! insert-if-absent semantics, [`PROVISION_CHUNK_SIZE`] rows per statement.

use std::collections::BTreeSet;

use super::{ModuleId, UserId};

/// Maximum progress rows inserted per statement.
pub const PROVISION_CHUNK_SIZE: usize = 100;

/// One progress row to create if absent, always starting incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgressSeed {
    /// Owner of the row.
    pub user_id: UserId,
    /// Tracked module.
    pub module_id: ModuleId,
}

/// Which rows a provisioning pass must guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningPlan {
    /// A new purchase: one user across the course's current modules.
    ForPurchaser {
        /// Buyer.
        user_id: UserId,
        /// Modules present when the purchase committed.
        modules: Vec<ModuleId>,
    },
    /// A new module: one module across the course's current purchasers.
    ForModule {
        /// Appended module.
        module_id: ModuleId,
        /// Purchasers present when the module was appended.
        purchasers: Vec<UserId>,
    },
    /// Repair pass: every purchaser across every module.
    ForCourse {
        /// Current purchasers.
        purchasers: Vec<UserId>,
        /// Current modules.
        modules: Vec<ModuleId>,
    },
}

impl ProvisioningPlan {
    /// Expand the plan into sorted, de-duplicated seeds.
    ///
    /// Sorting keeps insert order stable across concurrent passes, so two
    /// transactions provisioning overlapping rows acquire index locks in the
    /// same order.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{ModuleId, ProvisioningPlan, UserId};
    ///
    /// let plan = ProvisioningPlan::ForPurchaser {
    ///     user_id: UserId::random(),
    ///     modules: vec![ModuleId::new(2), ModuleId::new(1), ModuleId::new(2)],
    /// };
    /// assert_eq!(plan.seeds().len(), 2);
    /// ```
    pub fn seeds(&self) -> Vec<ProgressSeed> {
        let seeds: BTreeSet<ProgressSeed> = match self {
            Self::ForPurchaser { user_id, modules } => modules
                .iter()
                .map(|module_id| ProgressSeed {
                    user_id: *user_id,
                    module_id: *module_id,
                })
                .collect(),
            Self::ForModule {
                module_id,
                purchasers,
            } => purchasers
                .iter()
                .map(|user_id| ProgressSeed {
                    user_id: *user_id,
                    module_id: *module_id,
                })
                .collect(),
            Self::ForCourse {
                purchasers,
                modules,
            } => purchasers
                .iter()
                .flat_map(|user_id| {
                    modules.iter().map(move |module_id| ProgressSeed {
                        user_id: *user_id,
                        module_id: *module_id,
                    })
                })
                .collect(),
        };
        seeds.into_iter().collect()
    }

    /// Expand the plan into insert batches of at most
    /// [`PROVISION_CHUNK_SIZE`] seeds.
    pub fn seed_batches(&self) -> Vec<Vec<ProgressSeed>> {
        self.seeds()
            .chunks(PROVISION_CHUNK_SIZE)
            .map(<[ProgressSeed]>::to_vec)
            .collect()
    }
}
