use crate::domain::auction::Auction;
use crate::domain::balance::BalanceAccount;
use crate::domain::billing::{Billing, DocumentInfo};
use crate::domain::movement::{Movement, MovementStatus};
use crate::domain::ports::{Expected, LedgerCommit, LedgerStore};
use crate::domain::refund::Refund;
use crate::domain::{AuctionId, MovementId, RefundId, UserId};
use crate::error::{ConflictReason, LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_ACCOUNTS: &str = "accounts";
pub const CF_AUCTIONS: &str = "auctions";
pub const CF_MOVEMENTS: &str = "movements";
pub const CF_REFUNDS: &str = "refunds";
pub const CF_BILLINGS: &str = "billings";

/// Persistent store on RocksDB, one column family per entity, rows encoded
/// as JSON.
///
/// Commits validate expectations and write a single `WriteBatch` under a
/// commit guard, so the validate-and-apply step is atomic exactly like the
/// in-memory store's exclusive lock. `Clone` shares the underlying handle.
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<DB>,
    commit_guard: Arc<Mutex<()>>,
}

impl RocksDbLedgerStore {
    /// Opens or creates the database, ensuring all column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [
            CF_ACCOUNTS,
            CF_AUCTIONS,
            CF_MOVEMENTS,
            CF_REFUNDS,
            CF_BILLINGS,
        ]
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;
        Ok(Self {
            db: Arc::new(db),
            commit_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Io(std::io::Error::other(format!(
                "column family {name} missing"
            ))))
    }

    fn get<T: DeserializeOwned>(&self, cf: &'static str, key: u32) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        match self.db.get_cf(handle, key.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, batch: &mut WriteBatch, cf: &'static str, key: u32, row: &T) -> Result<()> {
        let handle = self.cf(cf)?;
        batch.put_cf(handle, key.to_be_bytes(), serde_json::to_vec(row)?);
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &'static str) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(handle, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn account(&self, user: UserId) -> Result<BalanceAccount> {
        Ok(self
            .get(CF_ACCOUNTS, user)?
            .unwrap_or_else(|| BalanceAccount::new(user)))
    }

    async fn auction(&self, id: AuctionId) -> Result<Option<Auction>> {
        self.get(CF_AUCTIONS, id)
    }

    async fn movement(&self, id: MovementId) -> Result<Option<Movement>> {
        self.get(CF_MOVEMENTS, id)
    }

    async fn refund(&self, id: RefundId) -> Result<Option<Refund>> {
        self.get(CF_REFUNDS, id)
    }

    async fn billing(&self, auction: AuctionId) -> Result<Option<Billing>> {
        self.get(CF_BILLINGS, auction)
    }

    async fn approved_movement(&self, auction: AuctionId) -> Result<Option<Movement>> {
        let movements: Vec<Movement> = self.scan(CF_MOVEMENTS)?;
        Ok(movements.into_iter().find(|movement| {
            movement.auction == auction && movement.estado == MovementStatus::Aprobado
        }))
    }

    async fn active_refund(&self, auction: AuctionId, user: UserId) -> Result<Option<Refund>> {
        let refunds: Vec<Refund> = self.scan(CF_REFUNDS)?;
        Ok(refunds.into_iter().find(|refund| {
            refund.auction == auction && refund.user == user && refund.estado.is_active()
        }))
    }

    async fn document_taken(&self, user: UserId, document: &DocumentInfo) -> Result<bool> {
        let billings: Vec<Billing> = self.scan(CF_BILLINGS)?;
        Ok(billings.iter().any(|billing| {
            billing.completed
                && billing.user == user
                && billing
                    .documento
                    .as_ref()
                    .is_some_and(|registered| registered.key() == document.key())
        }))
    }

    async fn commit(&self, commit: LedgerCommit) -> Result<()> {
        let _guard = self.commit_guard.lock().await;

        if let Some(write) = &commit.account {
            let current = self
                .get::<BalanceAccount>(CF_ACCOUNTS, write.account.user)?
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
            match (&write.expected, self.get::<Auction>(CF_AUCTIONS, id)?) {
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
            match (&write.expected, self.get::<Movement>(CF_MOVEMENTS, id)?) {
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
            match (&write.expected, self.get::<Refund>(CF_REFUNDS, id)?) {
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
            match (&write.expected, self.get::<Billing>(CF_BILLINGS, id)?) {
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

        let mut batch = WriteBatch::default();
        if let Some(write) = &commit.account {
            let mut account = write.account.clone();
            account.version = write.expected_version + 1;
            self.put(&mut batch, CF_ACCOUNTS, account.user, &account)?;
        }
        if let Some(write) = &commit.auction {
            self.put(&mut batch, CF_AUCTIONS, write.auction.id, &write.auction)?;
        }
        if let Some(write) = &commit.movement {
            self.put(&mut batch, CF_MOVEMENTS, write.movement.id, &write.movement)?;
        }
        if let Some(write) = &commit.refund {
            self.put(&mut batch, CF_REFUNDS, write.refund.id, &write.refund)?;
        }
        if let Some(write) = &commit.billing {
            self.put(&mut batch, CF_BILLINGS, write.billing.auction, &write.billing)?;
        }
        self.db.write(batch)?;
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<BalanceAccount>> {
        self.scan(CF_ACCOUNTS)
    }
}
