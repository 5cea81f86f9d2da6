use crate::domain::auction::{Auction, AuctionStatus};
use crate::domain::balance::BalanceAccount;
use crate::domain::billing::{Billing, DocumentInfo};
use crate::domain::movement::{Movement, MovementStatus};
use crate::domain::refund::{Refund, RefundStatus};
use crate::domain::{AuctionId, MovementId, RefundId, UserId};
use crate::error::Result;
use async_trait::async_trait;

/// State a row must be in for a write to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected<S> {
    /// The row must not exist yet (insert).
    Absent,
    /// The row must still carry this state (compare-and-commit transition).
    State(S),
}

#[derive(Debug)]
pub struct AccountWrite {
    pub account: BalanceAccount,
    pub expected_version: u64,
}

#[derive(Debug)]
pub struct AuctionWrite {
    pub auction: Auction,
    pub expected: Expected<AuctionStatus>,
}

#[derive(Debug)]
pub struct MovementWrite {
    pub movement: Movement,
    pub expected: Expected<MovementStatus>,
}

#[derive(Debug)]
pub struct RefundWrite {
    pub refund: Refund,
    pub expected: Expected<RefundStatus>,
}

#[derive(Debug)]
pub struct BillingWrite {
    pub billing: Billing,
    /// For billing the guarded state is the `completed` flag.
    pub expected: Expected<bool>,
}

/// One atomic write set, scoped to a single user's account plus the entity
/// rows being transitioned.
///
/// The store applies everything or nothing. An account whose version moved
/// surfaces as a transient conflict (the engine re-reads and retries); an
/// entity whose state moved surfaces as a business conflict (someone else
/// already won that transition).
#[derive(Debug, Default)]
pub struct LedgerCommit {
    pub account: Option<AccountWrite>,
    pub auction: Option<AuctionWrite>,
    pub movement: Option<MovementWrite>,
    pub refund: Option<RefundWrite>,
    pub billing: Option<BillingWrite>,
}

impl LedgerCommit {
    pub fn with_account(mut self, account: BalanceAccount, expected_version: u64) -> Self {
        self.account = Some(AccountWrite {
            account,
            expected_version,
        });
        self
    }

    pub fn with_auction(mut self, auction: Auction, expected: Expected<AuctionStatus>) -> Self {
        self.auction = Some(AuctionWrite { auction, expected });
        self
    }

    pub fn with_movement(mut self, movement: Movement, expected: Expected<MovementStatus>) -> Self {
        self.movement = Some(MovementWrite { movement, expected });
        self
    }

    pub fn with_refund(mut self, refund: Refund, expected: Expected<RefundStatus>) -> Self {
        self.refund = Some(RefundWrite { refund, expected });
        self
    }

    pub fn with_billing(mut self, billing: Billing, expected: Expected<bool>) -> Self {
        self.billing = Some(BillingWrite { billing, expected });
        self
    }
}

/// Storage port for the ledger.
///
/// Reads are plain lookups; all mutation goes through [`LedgerStore::commit`]
/// so no adapter can expose a half-applied operation.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// The user's account, zero-valued if none has been persisted yet.
    async fn account(&self, user: UserId) -> Result<BalanceAccount>;

    async fn auction(&self, id: AuctionId) -> Result<Option<Auction>>;

    async fn movement(&self, id: MovementId) -> Result<Option<Movement>>;

    async fn refund(&self, id: RefundId) -> Result<Option<Refund>>;

    async fn billing(&self, auction: AuctionId) -> Result<Option<Billing>>;

    /// The auction's approved movement, if any ever reached `aprobado`.
    async fn approved_movement(&self, auction: AuctionId) -> Result<Option<Movement>>;

    /// A refund still in `solicitado` or `confirmado` for this auction/user.
    async fn active_refund(&self, auction: AuctionId, user: UserId) -> Result<Option<Refund>>;

    /// Whether a completed billing of this user already carries the document.
    async fn document_taken(&self, user: UserId, document: &DocumentInfo) -> Result<bool>;

    /// Applies the write set atomically, or fails leaving nothing applied.
    async fn commit(&self, commit: LedgerCommit) -> Result<()>;

    async fn accounts(&self) -> Result<Vec<BalanceAccount>>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
