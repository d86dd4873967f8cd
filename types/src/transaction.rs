//! Ledger records and the balance derived from them.

use serde::{Deserialize, Serialize};

use crate::{Amount, ConfirmationType, PromotionId, Timestamp, TransactionId};

/// Where the value of a transaction came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Redemption,
    Promotion,
}

/// A settled ledger event. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub amount: Amount,
    pub timestamp: Timestamp,
    pub kind: TransactionKind,
    /// Set for redemptions only.
    pub confirmation_type: Option<ConfirmationType>,
}

impl Transaction {
    pub fn redemption(
        transaction_id: TransactionId,
        amount: Amount,
        confirmation_type: ConfirmationType,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            transaction_id,
            amount,
            timestamp,
            kind: TransactionKind::Redemption,
            confirmation_type: Some(confirmation_type),
        }
    }

    pub fn promotion(promotion: &Promotion, timestamp: Timestamp) -> Self {
        Self {
            transaction_id: TransactionId::for_promotion(&promotion.promotion_id),
            amount: promotion.amount,
            timestamp,
            kind: TransactionKind::Promotion,
            confirmation_type: None,
        }
    }
}

/// A grant credited independently of token redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub promotion_id: PromotionId,
    pub amount: Amount,
}

impl Promotion {
    pub fn new(promotion_id: PromotionId, amount: Amount) -> Self {
        Self {
            promotion_id,
            amount,
        }
    }
}

/// Totals of all accepted transactions, grouped by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub redemption_total: Amount,
    pub promotion_total: Amount,
}

impl Balance {
    pub fn total(&self) -> Amount {
        self.redemption_total + self.promotion_total
    }

    /// The balance after folding in `tx`, or `None` on overflow.
    pub fn with(self, tx: &Transaction) -> Option<Self> {
        let mut next = self;
        match tx.kind {
            TransactionKind::Redemption => {
                next.redemption_total = self.redemption_total.checked_add(tx.amount)?;
            }
            TransactionKind::Promotion => {
                next.promotion_total = self.promotion_total.checked_add(tx.amount)?;
            }
        }
        next.redemption_total.checked_add(next.promotion_total)?;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_groups_by_kind() {
        let promo = Promotion::new(PromotionId::new("p1"), Amount::from_bat(30));
        let redemption = Transaction::redemption(
            TransactionId::new("c1"),
            Amount::from_bat(1),
            ConfirmationType::View,
            Timestamp::new(5),
        );
        let balance = Balance::default()
            .with(&Transaction::promotion(&promo, Timestamp::new(1)))
            .and_then(|b| b.with(&redemption))
            .unwrap();
        assert_eq!(balance.promotion_total, Amount::from_bat(30));
        assert_eq!(balance.redemption_total, Amount::from_bat(1));
        assert_eq!(balance.total(), Amount::from_bat(31));
    }

    #[test]
    fn overflow_is_detected() {
        let huge = Transaction::redemption(
            TransactionId::new("x"),
            Amount::new(u128::MAX),
            ConfirmationType::Click,
            Timestamp::EPOCH,
        );
        let b = Balance::default().with(&huge).unwrap();
        assert!(b.with(&huge).is_none());
    }
}
