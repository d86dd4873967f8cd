//! Balance accounting over the transaction log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bat_types::{Balance, Clock, Promotion, Timestamp, Transaction, TransactionKind};

use crate::{LedgerError, TransactionLog};

/// Result of applying a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Already recorded; the balance is unchanged.
    Duplicate,
}

pub struct WalletLedger {
    log: TransactionLog,
    clock: Arc<dyn Clock>,
    balance: Mutex<Balance>,
}

impl WalletLedger {
    /// Open the ledger, rebuilding the balance from every logged transaction.
    pub fn open(log: TransactionLog, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let mut balance = Balance::default();
        let mut count = 0u64;
        for tx in log.iter() {
            balance = balance.with(&tx?).ok_or(LedgerError::Overflow)?;
            count += 1;
        }
        tracing::info!(
            transactions = count,
            total = %balance.total(),
            "wallet ledger opened"
        );
        Ok(Self {
            log,
            clock,
            balance: Mutex::new(balance),
        })
    }

    fn balance_guard(&self) -> MutexGuard<'_, Balance> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a redemption. A transaction id already in the log is a no-op.
    pub fn apply_redemption(&self, tx: &Transaction) -> Result<ApplyOutcome, LedgerError> {
        if tx.kind != TransactionKind::Redemption {
            return Err(LedgerError::WrongKind {
                expected: TransactionKind::Redemption,
                got: tx.kind,
            });
        }
        self.apply(tx)
    }

    /// Credit a promotion grant, returning the recorded transaction.
    ///
    /// Retrying the same promotion returns the original transaction and
    /// leaves the balance unchanged.
    pub fn apply_promotion(&self, promotion: &Promotion) -> Result<Transaction, LedgerError> {
        let tx = Transaction::promotion(promotion, self.clock.now());
        match self.apply(&tx)? {
            ApplyOutcome::Applied => Ok(tx),
            ApplyOutcome::Duplicate => Ok(self.log.get(&tx.transaction_id)?.unwrap_or(tx)),
        }
    }

    fn apply(&self, tx: &Transaction) -> Result<ApplyOutcome, LedgerError> {
        let mut balance = self.balance_guard();
        if self.log.contains(&tx.transaction_id)? {
            tracing::debug!(transaction_id = %tx.transaction_id, "duplicate transaction ignored");
            return Ok(ApplyOutcome::Duplicate);
        }
        let next = balance.with(tx).ok_or(LedgerError::Overflow)?;
        match self.log.append(tx) {
            Ok(seq) => {
                *balance = next;
                tracing::info!(
                    transaction_id = %tx.transaction_id,
                    kind = ?tx.kind,
                    amount = %tx.amount,
                    seq,
                    "transaction applied"
                );
                Ok(ApplyOutcome::Applied)
            }
            Err(LedgerError::DuplicateTransaction(id)) => {
                tracing::debug!(transaction_id = %id, "duplicate transaction ignored");
                Ok(ApplyOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    pub fn balance(&self) -> Balance {
        *self.balance_guard()
    }

    /// Redemptions with value in the calendar month (UTC) containing `now`.
    pub fn transactions_this_month(&self, now: Timestamp) -> Result<usize, LedgerError> {
        let mut count = 0;
        for tx in self.log.iter() {
            let tx = tx?;
            if tx.kind == TransactionKind::Redemption
                && !tx.amount.is_zero()
                && tx.timestamp.same_month_as(now)
            {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn history(&self, from: Timestamp, to: Timestamp) -> Result<Vec<Transaction>, LedgerError> {
        self.log.history(from, to)
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bat_nullables::{NullClock, NullTransactionStore};
    use bat_types::{Amount, ConfirmationType, PromotionId, TransactionId};

    fn ledger_at(secs: u64) -> (Arc<NullTransactionStore>, WalletLedger) {
        let store = Arc::new(NullTransactionStore::new());
        let ledger = WalletLedger::open(
            TransactionLog::new(store.clone()),
            Arc::new(NullClock::new(secs)),
        )
        .unwrap();
        (store, ledger)
    }

    fn redemption(id: &str, amount: Amount, ts: u64) -> Transaction {
        Transaction::redemption(
            TransactionId::new(id),
            amount,
            ConfirmationType::View,
            Timestamp::new(ts),
        )
    }

    #[test]
    fn redemption_applied_once() {
        let (_, ledger) = ledger_at(0);
        let tx = redemption("c1", Amount::from_bat(2), 1);
        assert_eq!(ledger.apply_redemption(&tx).unwrap(), ApplyOutcome::Applied);
        assert_eq!(ledger.apply_redemption(&tx).unwrap(), ApplyOutcome::Duplicate);
        assert_eq!(ledger.balance().redemption_total, Amount::from_bat(2));
        assert_eq!(ledger.log().len().unwrap(), 1);
    }

    #[test]
    fn promotion_retry_credits_once() {
        let (_, ledger) = ledger_at(100);
        let promo = Promotion::new(PromotionId::new("p1"), Amount::from_bat(30));
        let first = ledger.apply_promotion(&promo).unwrap();
        let again = ledger.apply_promotion(&promo).unwrap();
        assert_eq!(first, again);
        assert_eq!(ledger.balance().promotion_total, Amount::from_bat(30));
        assert_eq!(ledger.balance().total(), Amount::from_bat(30));
    }

    #[test]
    fn promotion_is_not_a_redemption() {
        let (_, ledger) = ledger_at(0);
        let promo = Promotion::new(PromotionId::new("p1"), Amount::from_bat(1));
        let tx = Transaction::promotion(&promo, Timestamp::EPOCH);
        assert!(matches!(
            ledger.apply_redemption(&tx),
            Err(LedgerError::WrongKind { .. })
        ));
    }

    #[test]
    fn reopen_rebuilds_balance() {
        let (store, ledger) = ledger_at(0);
        ledger
            .apply_redemption(&redemption("c1", Amount::from_bat(1), 1))
            .unwrap();
        ledger
            .apply_promotion(&Promotion::new(PromotionId::new("p"), Amount::from_bat(5)))
            .unwrap();
        drop(ledger);

        let reopened =
            WalletLedger::open(TransactionLog::new(store), Arc::new(NullClock::new(0))).unwrap();
        assert_eq!(reopened.balance().total(), Amount::from_bat(6));
    }

    #[test]
    fn overflow_rejected_without_logging() {
        let (_, ledger) = ledger_at(0);
        ledger
            .apply_redemption(&redemption("a", Amount::new(u128::MAX), 1))
            .unwrap();
        assert!(matches!(
            ledger.apply_redemption(&redemption("b", Amount::new(1), 2)),
            Err(LedgerError::Overflow)
        ));
        assert_eq!(ledger.log().len().unwrap(), 1);
    }

    #[test]
    fn duplicate_near_ceiling_is_not_an_overflow() {
        let (_, ledger) = ledger_at(0);
        let tx = redemption("a", Amount::new(u128::MAX), 1);
        assert_eq!(ledger.apply_redemption(&tx).unwrap(), ApplyOutcome::Applied);
        assert_eq!(ledger.apply_redemption(&tx).unwrap(), ApplyOutcome::Duplicate);
        assert_eq!(ledger.balance().total(), Amount::new(u128::MAX));
        assert_eq!(ledger.log().len().unwrap(), 1);
    }

    #[test]
    fn counts_valued_redemptions_this_month() {
        // 2024-02-10T00:00:00Z
        let feb = 1_707_523_200;
        let (_, ledger) = ledger_at(feb);
        ledger.apply_redemption(&redemption("jan", Amount::from_bat(1), feb - 20 * 86_400)).unwrap();
        ledger.apply_redemption(&redemption("feb1", Amount::from_bat(1), feb)).unwrap();
        ledger.apply_redemption(&redemption("feb2", Amount::ZERO, feb + 60)).unwrap();
        ledger
            .apply_promotion(&Promotion::new(PromotionId::new("p"), Amount::from_bat(1)))
            .unwrap();
        assert_eq!(ledger.transactions_this_month(Timestamp::new(feb)).unwrap(), 1);
    }
}
