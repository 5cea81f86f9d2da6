use crate::domain::auction::Auction;
use crate::domain::balance::BalanceAccount;
use crate::domain::billing::{Billing, DocumentInfo};
use crate::domain::movement::{Movement, MovementStatus};
use crate::domain::ports::{Expected, LedgerCommit, LedgerStore};
use crate::domain::refund::Refund;
use crate::domain::{AuctionId, MovementId, RefundId, UserId};
use crate::error::{ConflictReason, LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Rows {
    accounts: HashMap<UserId, BalanceAccount>,
    auctions: HashMap<AuctionId, Auction>,
    movements: HashMap<MovementId, Movement>,
    refunds: HashMap<RefundId, Refund>,
    billings: HashMap<AuctionId, Billing>,
}

/// Default store backing the engine.
///
/// Reads take the shared lock; a commit takes the exclusive lock only for
/// the validate-and-apply instant, so operations on different users never
/// serialize their full read-compute cycles. Expectation checks make the
/// commit a compare-and-commit: a moved account version is transient (the
/// engine re-reads and retries), a moved entity state is a business
/// conflict (that transition already happened).
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<Rows>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn account(&self, user: UserId) -> Result<BalanceAccount> {
        let rows = self.inner.read().await;
        Ok(rows
            .accounts
            .get(&user)
            .cloned()
            .unwrap_or_else(|| BalanceAccount::new(user)))
    }

    async fn auction(&self, id: AuctionId) -> Result<Option<Auction>> {
        let rows = self.inner.read().await;
        Ok(rows.auctions.get(&id).cloned())
    }

    async fn movement(&self, id: MovementId) -> Result<Option<Movement>> {
        let rows = self.inner.read().await;
        Ok(rows.movements.get(&id).cloned())
    }

    async fn refund(&self, id: RefundId) -> Result<Option<Refund>> {
        let rows = self.inner.read().await;
        Ok(rows.refunds.get(&id).cloned())
    }

    async fn billing(&self, auction: AuctionId) -> Result<Option<Billing>> {
        let rows = self.inner.read().await;
        Ok(rows.billings.get(&auction).cloned())
    }

    async fn approved_movement(&self, auction: AuctionId) -> Result<Option<Movement>> {
        let rows = self.inner.read().await;
        Ok(rows
            .movements
            .values()
            .find(|movement| {
                movement.auction == auction && movement.estado == MovementStatus::Aprobado
            })
            .cloned())
    }

    async fn active_refund(&self, auction: AuctionId, user: UserId) -> Result<Option<Refund>> {
        let rows = self.inner.read().await;
        Ok(rows
            .refunds
            .values()
            .find(|refund| {
                refund.auction == auction && refund.user == user && refund.estado.is_active()
            })
            .cloned())
    }

    async fn document_taken(&self, user: UserId, document: &DocumentInfo) -> Result<bool> {
        let rows = self.inner.read().await;
        Ok(rows.billings.values().any(|billing| {
            billing.completed
                && billing.user == user
                && billing
                    .documento
                    .as_ref()
                    .is_some_and(|registered| registered.key() == document.key())
        }))
    }

    async fn commit(&self, commit: LedgerCommit) -> Result<()> {
        let mut rows = self.inner.write().await;

        // Validate every expectation before touching anything.
        if let Some(write) = &commit.account {
            let current = rows
                .accounts
                .get(&write.account.user)
                .map_or(0, |account| account.version);
            if current != write.expected_version {
                return Err(LedgerError::Transient(format!(
                    "account {} moved from version {} to {}",
                    write.account.user, write.expected_version, current
                )));
            }
        }
        if let Some(write) = &commit.auction {
            let id = write.auction.id;
            match (&write.expected, rows.auctions.get(&id)) {
                (Expected::Absent, Some(_)) => {
                    return Err(ConflictReason::DuplicateAuction(id).into());
                }
                (Expected::State(_), None) => {
                    return Err(LedgerError::NotFound("auction", id));
                }
                (Expected::State(expected), Some(current)) if current.estado != *expected => {
                    return Err(ConflictReason::InvalidState {
                        entity: "auction",
                        id,
                        expected: expected.as_str(),
                        actual: current.estado.to_string(),
                    }
                    .into());
                }
                _ => {}
            }
        }
        if let Some(write) = &commit.movement {
            let id = write.movement.id;
            match (&write.expected, rows.movements.get(&id)) {
                (Expected::Absent, Some(_)) => {
                    return Err(ConflictReason::DuplicateMovement(id).into());
                }
                (Expected::State(_), None) => {
                    return Err(LedgerError::NotFound("movement", id));
                }
                (Expected::State(expected), Some(current)) if current.estado != *expected => {
                    return Err(ConflictReason::InvalidState {
                        entity: "movement",
                        id,
                        expected: expected.as_str(),
                        actual: current.estado.to_string(),
                    }
                    .into());
                }
                _ => {}
            }
        }
        if let Some(write) = &commit.refund {
            let id = write.refund.id;
            match (&write.expected, rows.refunds.get(&id)) {
                (Expected::Absent, Some(_)) => {
                    return Err(ConflictReason::DuplicateRefund(id).into());
                }
                (Expected::State(_), None) => {
                    return Err(LedgerError::NotFound("refund", id));
                }
                (Expected::State(expected), Some(current)) if current.estado != *expected => {
                    return Err(ConflictReason::InvalidState {
                        entity: "refund",
                        id,
                        expected: expected.as_str(),
                        actual: current.estado.to_string(),
                    }
                    .into());
                }
                _ => {}
            }
        }
        if let Some(write) = &commit.billing {
            let id = write.billing.auction;
            match (&write.expected, rows.billings.get(&id)) {
                (Expected::Absent, Some(_)) => {
                    return Err(ConflictReason::InvalidState {
                        entity: "billing",
                        id,
                        expected: "absent",
                        actual: "present".into(),
                    }
                    .into());
                }
                (Expected::State(_), None) => {
                    return Err(LedgerError::NotFound("billing of auction", id));
                }
                (Expected::State(false), Some(current)) if current.completed => {
                    return Err(ConflictReason::BillingAlreadyCompleted(id).into());
                }
                (Expected::State(true), Some(current)) if !current.completed => {
                    return Err(ConflictReason::InvalidState {
                        entity: "billing",
                        id,
                        expected: "completed",
                        actual: "pending".into(),
                    }
                    .into());
                }
                _ => {}
            }
        }

        // All expectations hold; apply the whole write set.
        if let Some(write) = commit.account {
            let mut account = write.account;
            account.version = write.expected_version + 1;
            rows.accounts.insert(account.user, account);
        }
        if let Some(write) = commit.auction {
            rows.auctions.insert(write.auction.id, write.auction);
        }
        if let Some(write) = commit.movement {
            rows.movements.insert(write.movement.id, write.movement);
        }
        if let Some(write) = commit.refund {
            rows.refunds.insert(write.refund.id, write.refund);
        }
        if let Some(write) = commit.billing {
            rows.billings.insert(write.billing.auction, write.billing);
        }
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<BalanceAccount>> {
        let rows = self.inner.read().await;
        Ok(rows.accounts.values().cloned().collect())
    }
}
