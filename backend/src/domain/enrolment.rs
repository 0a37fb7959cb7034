//! Purchases and the balance rules that gate them.
//!
//! The persistence adapter loads an [`EnrolmentSnapshot`] from locked rows and
//! asks [`EnrolmentSnapshot::authorise`] whether the purchase may proceed. The
//! rule lives here so the adapter never decides on its own what counts as an
//! affordable, first-time purchase.

use serde::{Deserialize, Serialize};

use super::{CourseId, Money, PurchaseId, UserId};

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Identifier of the new purchase.
    pub purchase_id: PurchaseId,
    /// Purchased course.
    pub course_id: CourseId,
    /// Amount debited.
    pub amount_paid: Money,
    /// Balance after the debit.
    pub balance: Money,
    /// Number of progress rows provisioned for the buyer.
    pub provisioned_modules: usize,
}

/// State re-read under lock at the start of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrolmentSnapshot {
    /// Buyer's balance as stored.
    pub balance: Money,
    /// Course price as stored.
    pub price: Money,
    /// Whether a purchase row already exists for the pair.
    pub already_purchased: bool,
}

/// Approved debit for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debit {
    /// Amount to charge.
    pub amount: Money,
    /// Balance to store after charging.
    pub remaining: Money,
}

/// Reasons a purchase is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnrolmentDenial {
    /// The pair already has a purchase.
    #[error("course already purchased")]
    AlreadyPurchased,
    /// The balance does not cover the price.
    #[error("balance {balance} does not cover price {price}")]
    InsufficientBalance {
        /// Stored balance.
        balance: Money,
        /// Stored price.
        price: Money,
    },
}

impl EnrolmentSnapshot {
    /// Decide whether the purchase may proceed and compute the debit.
    ///
    /// Duplicate purchases are refused before the balance is considered, so a
    /// repeat buyer with an empty wallet still hears that they own the course.
    ///
    /// # Examples
    /// ```
    /// use academy::domain::{EnrolmentDenial, EnrolmentSnapshot, Money};
    ///
    /// let snapshot = EnrolmentSnapshot {
    ///     balance: Money::from_minor_units(1_000).expect("valid"),
    ///     price: Money::from_minor_units(2_500).expect("valid"),
    ///     already_purchased: false,
    /// };
    /// assert!(matches!(
    ///     snapshot.authorise(),
    ///     Err(EnrolmentDenial::InsufficientBalance { .. })
    /// ));
    /// ```
    pub fn authorise(self) -> Result<Debit, EnrolmentDenial> {
        if self.already_purchased {
            return Err(EnrolmentDenial::AlreadyPurchased);
        }
        let remaining =
            self.balance
                .checked_sub(self.price)
                .ok_or(EnrolmentDenial::InsufficientBalance {
                    balance: self.balance,
                    price: self.price,
                })?;
        Ok(Debit {
            amount: self.price,
            remaining,
        })
    }
}

/// Result of crediting a user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceStatement {
    /// Buyer whose balance changed.
    pub user_id: UserId,
    /// Amount credited.
    pub credited: Money,
    /// Balance after the credit.
    pub balance: Money,
}
