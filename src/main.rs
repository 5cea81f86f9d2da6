use almoneda::application::engine::LedgerEngine;
use almoneda::domain::actor::Actor;
use almoneda::error::Result;
use almoneda::infrastructure::in_memory::InMemoryLedgerStore;
use almoneda::interfaces::csv::snapshot_writer::SnapshotWriter;
use almoneda::interfaces::jsonl::op_reader::{LedgerOp, OpReader};
use clap::Parser;
use miette::{IntoDiagnostic, miette};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

/// Replays a ledger operation feed and prints the final balances as CSV.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations file, one JSON object per line
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // stdout carries the CSV report; logs go to stderr
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();

    let engine = build_engine(cli.db_path)?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = OpReader::new(BufReader::new(file));
    for op_result in reader.ops() {
        match op_result {
            Ok(op) => {
                if let Err(error) = apply(&engine, op).await {
                    tracing::warn!(%error, code = error.code(), "operation rejected");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "skipping malformed operation line");
            }
        }
    }

    let snapshots = engine.balances().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = SnapshotWriter::new(stdout.lock());
    writer.write_snapshots(&snapshots).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_engine(db_path: Option<PathBuf>) -> miette::Result<LedgerEngine> {
    use almoneda::infrastructure::rocksdb::RocksDbLedgerStore;

    let engine = match db_path {
        Some(path) => {
            let store = RocksDbLedgerStore::open(path).into_diagnostic()?;
            LedgerEngine::with_store(Box::new(store))
        }
        None => LedgerEngine::with_store(Box::new(InMemoryLedgerStore::new())),
    };
    Ok(engine)
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_engine(db_path: Option<PathBuf>) -> miette::Result<LedgerEngine> {
    if db_path.is_some() {
        return Err(miette!(
            "--db-path requires the storage-rocksdb feature"
        ));
    }
    Ok(LedgerEngine::with_store(Box::new(InMemoryLedgerStore::new())))
}

async fn apply(engine: &LedgerEngine, op: LedgerOp) -> Result<()> {
    match op {
        LedgerOp::RegisterAuction {
            auction,
            winner,
            admin,
            monto_oferta,
            fecha_inicio,
            fecha_limite_pago,
        } => {
            engine
                .register_auction(
                    Actor::admin(admin),
                    auction,
                    winner,
                    monto_oferta,
                    fecha_inicio,
                    fecha_limite_pago,
                )
                .await
        }
        LedgerOp::SubmitPayment {
            movement,
            auction,
            user,
            monto,
            fecha_pago,
            voucher,
        } => engine
            .submit_payment(Actor::client(user), movement, auction, monto, fecha_pago, voucher)
            .await
            .map(|_| ()),
        LedgerOp::ApprovePayment { movement, admin } => engine
            .approve_payment(Actor::admin(admin), movement)
            .await
            .map(|_| ()),
        LedgerOp::RejectPayment {
            movement,
            admin,
            reasons,
        } => engine
            .reject_payment(Actor::admin(admin), movement, reasons)
            .await
            .map(|_| ()),
        LedgerOp::SetCompetitionResult {
            auction,
            admin,
            outcome,
        } => engine
            .set_competition_result(Actor::admin(admin), auction, outcome)
            .await
            .map(|_| ()),
        LedgerOp::CompleteBilling {
            auction,
            user,
            document,
        } => engine
            .complete_billing(Actor::client(user), auction, document)
            .await
            .map(|_| ()),
        LedgerOp::RequestRefund {
            refund,
            auction,
            user,
            monto,
            modo,
        } => engine
            .request_refund(Actor::client(user), refund, auction, monto, modo)
            .await
            .map(|_| ()),
        LedgerOp::ManageRefund {
            refund,
            admin,
            decision,
        } => engine
            .manage_refund(Actor::admin(admin), refund, decision)
            .await
            .map(|_| ()),
        LedgerOp::ProcessRefund {
            refund,
            admin,
            referencia,
        } => engine
            .process_refund(Actor::admin(admin), refund, referencia)
            .await
            .map(|_| ()),
    }
}
