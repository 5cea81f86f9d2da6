use crate::application::notify::{LedgerEvent, LoggingNotifier, NotifierBox};
use crate::domain::actor::Actor;
use crate::domain::auction::{Auction, AuctionStatus, CompetitionOutcome};
use crate::domain::balance::{Adjustment, Amount, BalanceSnapshot};
use crate::domain::billing::{Billing, DocumentInfo};
use crate::domain::movement::{Movement, MovementStatus, RejectReason};
use crate::domain::ports::{Expected, LedgerCommit, LedgerStoreBox};
use crate::domain::refund::{Refund, RefundDecision, RefundMode, RefundStatus};
use crate::domain::{AuctionId, MovementId, RefundId, UserId};
use crate::error::{ConflictReason, ForbiddenReason, LedgerError, Result, ValidationReason};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;

/// Attempts per operation before a storage conflict escapes as transient.
const COMMIT_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 10;

/// Auction states in which a refund may be requested: the competition is
/// decided (or the auction died) and the guarantee is no longer pending an
/// outcome.
const REFUNDABLE_STATES: [AuctionStatus; 3] = [
    AuctionStatus::Perdida,
    AuctionStatus::Penalizada,
    AuctionStatus::Vencida,
];

/// The balance ledger engine.
///
/// Owns the storage and notification ports and exposes one method per
/// financial operation. Every method returns the post-operation
/// [`BalanceSnapshot`] of the affected user, or a typed error with no
/// partial effect.
pub struct LedgerEngine {
    store: LedgerStoreBox,
    notifier: NotifierBox,
}

impl LedgerEngine {
    pub fn new(store: LedgerStoreBox, notifier: NotifierBox) -> Self {
        Self { store, notifier }
    }

    /// Engine with the default logging notifier.
    pub fn with_store(store: LedgerStoreBox) -> Self {
        Self::new(store, Box::new(LoggingNotifier))
    }

    /// Registration feed from auction management: a finished competition
    /// with its winner assigned, entering in `pendiente_pago`. Not a balance
    /// operation.
    pub async fn register_auction(
        &self,
        actor: Actor,
        auction: AuctionId,
        winner: UserId,
        monto_oferta: Decimal,
        fecha_inicio: DateTime<Utc>,
        fecha_limite_pago: DateTime<Utc>,
    ) -> Result<()> {
        actor.require_admin()?;
        let monto_oferta = Amount::new(monto_oferta)?;
        if fecha_inicio > fecha_limite_pago {
            return Err(ValidationReason::InvalidAuctionWindow.into());
        }
        if self.store.auction(auction).await?.is_some() {
            return Err(ConflictReason::DuplicateAuction(auction).into());
        }

        let record = Auction::register(auction, winner, monto_oferta, fecha_inicio, fecha_limite_pago);
        self.store
            .commit(LedgerCommit::default().with_auction(record, Expected::Absent))
            .await?;
        tracing::info!(auction, winner, "auction registered");
        Ok(())
    }

    /// Client submits a guarantee payment voucher. No ledger effect.
    pub async fn submit_payment(
        &self,
        actor: Actor,
        movement: MovementId,
        auction: AuctionId,
        monto: Decimal,
        fecha_pago: DateTime<Utc>,
        voucher: Option<String>,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("submit_payment", || {
            let voucher = voucher.clone();
            self.try_submit_payment(actor, movement, auction, monto, fecha_pago, voucher)
        })
        .await
    }

    /// Admin approves a pending submission: the guarantee enters the ledger
    /// as held balance and the auction becomes `pagada`.
    pub async fn approve_payment(
        &self,
        actor: Actor,
        movement: MovementId,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("approve_payment", || {
            self.try_approve_payment(actor, movement)
        })
        .await
    }

    /// Admin rejects a pending submission with one or more reason codes.
    /// No ledger effect; the client may submit again.
    pub async fn reject_payment(
        &self,
        actor: Actor,
        movement: MovementId,
        reasons: Vec<RejectReason>,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("reject_payment", || {
            let reasons = reasons.clone();
            self.try_reject_payment(actor, movement, reasons)
        })
        .await
    }

    /// Admin records the competition outcome for a paid auction.
    /// `penalizada` forfeits 30% of the guarantee and releases the rest in
    /// one compound adjustment.
    pub async fn set_competition_result(
        &self,
        actor: Actor,
        auction: AuctionId,
        outcome: CompetitionOutcome,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("set_competition_result", || {
            self.try_set_competition_result(actor, auction, outcome)
        })
        .await
    }

    /// Completes the billing of a won auction: the held guarantee becomes
    /// applied (spent) balance. One-time.
    pub async fn complete_billing(
        &self,
        actor: Actor,
        auction: AuctionId,
        document: DocumentInfo,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("complete_billing", || {
            let document = document.clone();
            self.try_complete_billing(actor, auction, document)
        })
        .await
    }

    /// Client asks to release or remit part of their balance tied to an
    /// auction. No ledger effect until processed.
    pub async fn request_refund(
        &self,
        actor: Actor,
        refund: RefundId,
        auction: AuctionId,
        monto: Decimal,
        modo: RefundMode,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("request_refund", || {
            self.try_request_refund(actor, refund, auction, monto, modo)
        })
        .await
    }

    /// Admin confirms, rejects or cancels a refund. Authorization gate only;
    /// never moves money.
    pub async fn manage_refund(
        &self,
        actor: Actor,
        refund: RefundId,
        decision: RefundDecision,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("manage_refund", || {
            self.try_manage_refund(actor, refund, decision)
        })
        .await
    }

    /// Admin settles a confirmed refund. Whether the amount is still held or
    /// already available is recomputed here from the auction's current
    /// contribution, never trusted from request time.
    pub async fn process_refund(
        &self,
        actor: Actor,
        refund: RefundId,
        referencia: Option<String>,
    ) -> Result<BalanceSnapshot> {
        self.with_retry("process_refund", || {
            let referencia = referencia.clone();
            self.try_process_refund(actor, refund, referencia)
        })
        .await
    }

    /// Final state of every account, ordered by user.
    pub async fn balances(&self) -> Result<Vec<BalanceSnapshot>> {
        let mut accounts = self.store.accounts().await?;
        accounts.sort_by_key(|account| account.user);
        Ok(accounts.iter().map(|account| account.snapshot()).collect())
    }

    async fn try_submit_payment(
        &self,
        actor: Actor,
        movement: MovementId,
        auction_id: AuctionId,
        monto: Decimal,
        fecha_pago: DateTime<Utc>,
        voucher: Option<String>,
    ) -> Result<BalanceSnapshot> {
        let monto = Amount::new(monto)?;
        let auction = self
            .store
            .auction(auction_id)
            .await?
            .ok_or(LedgerError::NotFound("auction", auction_id))?;

        if auction.winner != Some(actor.user) {
            return Err(ForbiddenReason::NotCurrentWinner {
                user: actor.user,
                auction: auction_id,
            }
            .into());
        }
        if self.store.approved_movement(auction_id).await?.is_some() {
            return Err(ConflictReason::DuplicateApprovedPayment(auction_id).into());
        }
        if auction.estado != AuctionStatus::PendientePago {
            return Err(invalid_state("auction", auction_id, AuctionStatus::PendientePago.as_str(), auction.estado));
        }
        let now = Utc::now();
        if fecha_pago < auction.fecha_inicio || fecha_pago > now {
            return Err(ValidationReason::InvalidPaymentDate {
                fecha_pago,
                fecha_inicio: auction.fecha_inicio,
            }
            .into());
        }
        if self.store.movement(movement).await?.is_some() {
            return Err(ConflictReason::DuplicateMovement(movement).into());
        }

        let record =
            Movement::submitted(movement, auction_id, actor.user, monto, fecha_pago, voucher);
        self.store
            .commit(LedgerCommit::default().with_movement(record, Expected::Absent))
            .await?;

        tracing::info!(movement, auction = auction_id, user = actor.user, "payment submitted");
        self.dispatch(LedgerEvent::PaymentSubmitted {
            movement,
            auction: auction_id,
            user: actor.user,
        })
        .await;
        Ok(self.store.account(actor.user).await?.snapshot())
    }

    async fn try_approve_payment(
        &self,
        actor: Actor,
        movement_id: MovementId,
    ) -> Result<BalanceSnapshot> {
        actor.require_admin()?;
        let movement = self
            .store
            .movement(movement_id)
            .await?
            .ok_or(LedgerError::NotFound("movement", movement_id))?;
        if movement.estado != MovementStatus::Pendiente {
            return Err(invalid_state(
                "movement",
                movement_id,
                MovementStatus::Pendiente.as_str(),
                movement.estado,
            ));
        }

        let auction = self
            .store
            .auction(movement.auction)
            .await?
            .ok_or(LedgerError::NotFound("auction", movement.auction))?;
        if self.store.approved_movement(auction.id).await?.is_some() {
            return Err(ConflictReason::DuplicateApprovedPayment(auction.id).into());
        }
        if auction.estado != AuctionStatus::PendientePago {
            return Err(invalid_state("auction", auction.id, AuctionStatus::PendientePago.as_str(), auction.estado));
        }

        // Total and retenido rise together; disponible is untouched.
        let mut account = self.store.account(movement.user).await?;
        let expected_version = account.version;
        let snapshot = account.apply(Adjustment::new(
            auction.garantia,
            auction.garantia,
            Decimal::ZERO,
        ))?;

        let mut paid = auction.clone();
        paid.estado = AuctionStatus::Pagada;
        paid.monto_retenido = auction.garantia;
        let mut approved = movement.clone();
        approved.estado = MovementStatus::Aprobado;

        self.store
            .commit(
                LedgerCommit::default()
                    .with_account(account, expected_version)
                    .with_auction(paid, Expected::State(AuctionStatus::PendientePago))
                    .with_movement(approved, Expected::State(MovementStatus::Pendiente)),
            )
            .await?;

        tracing::info!(
            movement = movement_id,
            auction = auction.id,
            user = movement.user,
            garantia = %auction.garantia,
            "guarantee payment approved"
        );
        self.dispatch(LedgerEvent::PaymentApproved {
            movement: movement_id,
            auction: auction.id,
            user: movement.user,
            garantia: auction.garantia,
        })
        .await;
        Ok(snapshot)
    }

    async fn try_reject_payment(
        &self,
        actor: Actor,
        movement_id: MovementId,
        reasons: Vec<RejectReason>,
    ) -> Result<BalanceSnapshot> {
        actor.require_admin()?;
        if reasons.is_empty() {
            return Err(ValidationReason::NoRejectReasons.into());
        }
        let movement = self
            .store
            .movement(movement_id)
            .await?
            .ok_or(LedgerError::NotFound("movement", movement_id))?;
        if movement.estado != MovementStatus::Pendiente {
            return Err(invalid_state(
                "movement",
                movement_id,
                MovementStatus::Pendiente.as_str(),
                movement.estado,
            ));
        }

        let mut rejected = movement.clone();
        rejected.estado = MovementStatus::Rechazado;
        rejected.motivos_rechazo = reasons;

        self.store
            .commit(
                LedgerCommit::default()
                    .with_movement(rejected, Expected::State(MovementStatus::Pendiente)),
            )
            .await?;

        tracing::info!(movement = movement_id, auction = movement.auction, "payment rejected");
        self.dispatch(LedgerEvent::PaymentRejected {
            movement: movement_id,
            auction: movement.auction,
            user: movement.user,
        })
        .await;
        Ok(self.store.account(movement.user).await?.snapshot())
    }

    async fn try_set_competition_result(
        &self,
        actor: Actor,
        auction_id: AuctionId,
        outcome: CompetitionOutcome,
    ) -> Result<BalanceSnapshot> {
        actor.require_admin()?;
        let auction = self
            .store
            .auction(auction_id)
            .await?
            .ok_or(LedgerError::NotFound("auction", auction_id))?;
        if auction.estado != AuctionStatus::Pagada {
            return Err(invalid_state("auction", auction_id, AuctionStatus::Pagada.as_str(), auction.estado));
        }
        let user = auction
            .winner
            .ok_or(LedgerError::NotFound("winner of auction", auction_id))?;

        let mut decided = auction.clone();
        decided.estado = outcome.target_status();

        let mut commit = LedgerCommit::default();
        let snapshot = match outcome {
            CompetitionOutcome::Ganada => {
                // No ledger effect; billing becomes available.
                commit = commit
                    .with_auction(decided, Expected::State(AuctionStatus::Pagada))
                    .with_billing(Billing::pending(auction_id, user), Expected::Absent);
                self.store.account(user).await?.snapshot()
            }
            CompetitionOutcome::Perdida => {
                // Funds stay retained until a refund is processed.
                commit = commit.with_auction(decided, Expected::State(AuctionStatus::Pagada));
                self.store.account(user).await?.snapshot()
            }
            CompetitionOutcome::Penalizada => {
                // One compound adjustment: the penalty leaves the system and
                // the remainder of the hold becomes disponible.
                let penalty = auction.penalty();
                let mut account = self.store.account(user).await?;
                let expected_version = account.version;
                let snapshot = account.apply(Adjustment::new(
                    -penalty,
                    -auction.garantia,
                    Decimal::ZERO,
                ))?;
                decided.monto_retenido = Decimal::ZERO;
                commit = commit
                    .with_account(account, expected_version)
                    .with_auction(decided, Expected::State(AuctionStatus::Pagada));
                snapshot
            }
        };

        self.store.commit(commit).await?;

        tracing::info!(auction = auction_id, user, %outcome, "competition result recorded");
        self.dispatch(LedgerEvent::ResultRecorded {
            auction: auction_id,
            user,
            outcome,
        })
        .await;
        Ok(snapshot)
    }

    async fn try_complete_billing(
        &self,
        actor: Actor,
        auction_id: AuctionId,
        document: DocumentInfo,
    ) -> Result<BalanceSnapshot> {
        document.validate()?;
        let auction = self
            .store
            .auction(auction_id)
            .await?
            .ok_or(LedgerError::NotFound("auction", auction_id))?;
        if auction.estado != AuctionStatus::Ganada {
            return Err(invalid_state("auction", auction_id, AuctionStatus::Ganada.as_str(), auction.estado));
        }
        let user = auction
            .winner
            .ok_or(LedgerError::NotFound("winner of auction", auction_id))?;
        actor.require_owner(user, "billing of auction", auction_id)?;

        let billing = self
            .store
            .billing(auction_id)
            .await?
            .ok_or(LedgerError::NotFound("billing of auction", auction_id))?;
        if billing.completed {
            return Err(ConflictReason::BillingAlreadyCompleted(auction_id).into());
        }
        if self.store.document_taken(user, &document).await? {
            return Err(ConflictReason::DuplicateBillingDocument.into());
        }

        // Held moves to applied in lockstep; total and disponible unchanged.
        let mut account = self.store.account(user).await?;
        let expected_version = account.version;
        let snapshot = account.apply(Adjustment::new(
            Decimal::ZERO,
            -auction.garantia,
            auction.garantia,
        ))?;

        let mut invoiced = auction.clone();
        invoiced.estado = AuctionStatus::Facturada;
        invoiced.monto_retenido = Decimal::ZERO;
        let mut completed = billing.clone();
        completed.completed = true;
        completed.documento = Some(document);

        self.store
            .commit(
                LedgerCommit::default()
                    .with_account(account, expected_version)
                    .with_auction(invoiced, Expected::State(AuctionStatus::Ganada))
                    .with_billing(completed, Expected::State(false)),
            )
            .await?;

        tracing::info!(auction = auction_id, user, "billing completed");
        self.dispatch(LedgerEvent::BillingCompleted {
            auction: auction_id,
            user,
        })
        .await;
        Ok(snapshot)
    }

    async fn try_request_refund(
        &self,
        actor: Actor,
        refund_id: RefundId,
        auction_id: AuctionId,
        monto: Decimal,
        modo: RefundMode,
    ) -> Result<BalanceSnapshot> {
        let monto = Amount::new(monto)?;
        let auction = self
            .store
            .auction(auction_id)
            .await?
            .ok_or(LedgerError::NotFound("auction", auction_id))?;
        if auction.winner != Some(actor.user) {
            return Err(ForbiddenReason::NotOwner {
                user: actor.user,
                entity: "auction",
                id: auction_id,
            }
            .into());
        }
        if !REFUNDABLE_STATES.contains(&auction.estado) {
            return Err(invalid_state("auction", auction_id, "perdida, penalizada or vencida", auction.estado));
        }
        if self.store.approved_movement(auction_id).await?.is_none() {
            return Err(ConflictReason::RefundNotBacked(auction_id).into());
        }
        if self
            .store
            .active_refund(auction_id, actor.user)
            .await?
            .is_some()
        {
            return Err(ConflictReason::DuplicateRefundRequest(auction_id).into());
        }
        if self.store.refund(refund_id).await?.is_some() {
            return Err(ConflictReason::DuplicateRefund(refund_id).into());
        }

        // The refundable base is what is free plus what this auction still
        // holds; holds of other auctions never count.
        let account = self.store.account(actor.user).await?;
        if monto.value() > account.disponible() + auction.monto_retenido {
            return Err(ConflictReason::InsufficientAvailableBalance.into());
        }

        let record = Refund::requested(refund_id, auction_id, actor.user, monto, modo);
        self.store
            .commit(LedgerCommit::default().with_refund(record, Expected::Absent))
            .await?;

        tracing::info!(refund = refund_id, auction = auction_id, user = actor.user, "refund requested");
        self.dispatch(LedgerEvent::RefundRequested {
            refund: refund_id,
            auction: auction_id,
            user: actor.user,
            monto: monto.value(),
        })
        .await;
        Ok(account.snapshot())
    }

    async fn try_manage_refund(
        &self,
        actor: Actor,
        refund_id: RefundId,
        decision: RefundDecision,
    ) -> Result<BalanceSnapshot> {
        actor.require_admin()?;
        let refund = self
            .store
            .refund(refund_id)
            .await?
            .ok_or(LedgerError::NotFound("refund", refund_id))?;
        let (from, to) = decision.transition();
        if refund.estado != from {
            return Err(invalid_state("refund", refund_id, from.as_str(), refund.estado));
        }

        let mut managed = refund.clone();
        managed.estado = to;
        self.store
            .commit(LedgerCommit::default().with_refund(managed, Expected::State(from)))
            .await?;

        tracing::info!(refund = refund_id, estado = %to, "refund managed");
        self.dispatch(LedgerEvent::RefundManaged {
            refund: refund_id,
            user: refund.user,
            estado: to,
        })
        .await;
        Ok(self.store.account(refund.user).await?.snapshot())
    }

    async fn try_process_refund(
        &self,
        actor: Actor,
        refund_id: RefundId,
        referencia: Option<String>,
    ) -> Result<BalanceSnapshot> {
        actor.require_admin()?;
        let refund = self
            .store
            .refund(refund_id)
            .await?
            .ok_or(LedgerError::NotFound("refund", refund_id))?;
        if refund.estado != RefundStatus::Confirmado {
            return Err(invalid_state(
                "refund",
                refund_id,
                RefundStatus::Confirmado.as_str(),
                refund.estado,
            ));
        }
        let auction = self
            .store
            .auction(refund.auction)
            .await?
            .ok_or(LedgerError::NotFound("auction", refund.auction))?;

        let mut account = self.store.account(refund.user).await?;
        let expected_version = account.version;
        let held = auction.monto_retenido;
        let monto = refund.monto;

        let mut commit = LedgerCommit::default();
        let snapshot = if held >= monto {
            // Still held for this auction: release the hold, and for
            // devolver_dinero the money also leaves the system.
            let adjustment = match refund.modo {
                RefundMode::DevolverDinero => Adjustment::new(-monto, -monto, Decimal::ZERO),
                RefundMode::MantenerSaldo => Adjustment::new(Decimal::ZERO, -monto, Decimal::ZERO),
            };
            let snapshot = account.apply(adjustment)?;
            let mut drained = auction.clone();
            drained.monto_retenido = held - monto;
            commit = commit
                .with_account(account, expected_version)
                .with_auction(drained, Expected::State(auction.estado));
            snapshot
        } else if held.is_zero() {
            // Already released (e.g. the post-penalty remainder).
            match refund.modo {
                RefundMode::DevolverDinero => {
                    if monto > account.disponible() {
                        return Err(ConflictReason::InsufficientAvailableBalance.into());
                    }
                    let snapshot =
                        account.apply(Adjustment::new(-monto, Decimal::ZERO, Decimal::ZERO))?;
                    commit = commit.with_account(account, expected_version);
                    snapshot
                }
                // The amount is already part of disponible; processing only
                // records the client's consent.
                RefundMode::MantenerSaldo => account.snapshot(),
            }
        } else {
            return Err(ConflictReason::RefundSplitsHold(refund.auction).into());
        };

        let mut processed = refund.clone();
        processed.estado = RefundStatus::Procesado;
        processed.referencia = referencia;
        commit = commit.with_refund(processed, Expected::State(RefundStatus::Confirmado));

        self.store.commit(commit).await?;

        tracing::info!(
            refund = refund_id,
            auction = refund.auction,
            user = refund.user,
            monto = %monto,
            "refund processed"
        );
        self.dispatch(LedgerEvent::RefundProcessed {
            refund: refund_id,
            auction: refund.auction,
            user: refund.user,
            monto,
            modo: refund.modo,
        })
        .await;
        Ok(snapshot)
    }

    /// Bounded retry for transient storage conflicts. Business failures pass
    /// through untouched on the first occurrence.
    async fn with_retry<T, Fut>(
        &self,
        op: &'static str,
        mut call: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(LedgerError::Transient(reason)) if attempt + 1 < COMMIT_ATTEMPTS => {
                    attempt += 1;
                    tracing::debug!(op, %reason, attempt, "commit conflicted, retrying");
                    tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS << attempt)).await;
                }
                other => return other,
            }
        }
    }

    async fn dispatch(&self, event: LedgerEvent) {
        if let Err(error) = self.notifier.notify(&event).await {
            tracing::warn!(%error, ?event, "notification dropped");
        }
    }
}

fn invalid_state(
    entity: &'static str,
    id: u32,
    expected: &'static str,
    actual: impl std::fmt::Display,
) -> LedgerError {
    ConflictReason::InvalidState {
        entity,
        id,
        expected,
        actual: actual.to_string(),
    }
    .into()
}
