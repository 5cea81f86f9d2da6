use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_replay_end_to_end() {
    let mut file = NamedTempFile::new().unwrap();
    // user 10 wins auction 1, pays, wins the competition and completes billing
    writeln!(file, r#"{{"op":"register_auction","auction":1,"winner":10,"admin":900,"monto_oferta":"1250.00","fecha_inicio":"2026-03-01T00:00:00Z","fecha_limite_pago":"2099-03-15T00:00:00Z"}}"#).unwrap();
    writeln!(file, r#"{{"op":"submit_payment","movement":1,"auction":1,"user":10,"monto":"100.00","fecha_pago":"2026-03-02T10:00:00Z","voucher":"v-1.jpg"}}"#).unwrap();
    writeln!(file, r#"{{"op":"approve_payment","movement":1,"admin":900}}"#).unwrap();
    writeln!(file, r#"{{"op":"set_competition_result","auction":1,"admin":900,"outcome":"ganada"}}"#).unwrap();
    writeln!(file, r#"{{"op":"complete_billing","auction":1,"user":10,"document":{{"tipo":"dni","numero":"45871236","nombre":"Ana Quispe"}}}}"#).unwrap();
    // user 20 wins auction 2, pays, gets penalized
    writeln!(file, r#"{{"op":"register_auction","auction":2,"winner":20,"admin":900,"monto_oferta":"15000.00","fecha_inicio":"2026-03-01T00:00:00Z","fecha_limite_pago":"2099-03-15T00:00:00Z"}}"#).unwrap();
    writeln!(file, r#"{{"op":"submit_payment","movement":2,"auction":2,"user":20,"monto":"1200.00","fecha_pago":"2026-03-02T10:00:00Z"}}"#).unwrap();
    writeln!(file, r#"{{"op":"approve_payment","movement":2,"admin":900}}"#).unwrap();
    writeln!(file, r#"{{"op":"set_competition_result","auction":2,"admin":900,"outcome":"penalizada"}}"#).unwrap();
    // rejected operation and malformed line: reported, not fatal
    writeln!(file, r#"{{"op":"approve_payment","movement":1,"admin":900}}"#).unwrap();
    writeln!(file, r#"{{"op":"approve_payment""#).unwrap();

    let mut cmd = Command::new(cargo_bin!("almoneda"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "user,total,retenido,aplicado,disponible",
        ))
        // billing applied the full guarantee
        .stdout(predicate::str::contains("10,100.00,0.00,100.00,0.00"))
        // penalty forfeited 30%, the rest is disponible
        .stdout(predicate::str::contains("20,840.00,0.00,0.00,840.00"));
}

#[test]
fn test_replay_refund_flow() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"op":"register_auction","auction":1,"winner":10,"admin":900,"monto_oferta":"8500.00","fecha_inicio":"2026-03-01T00:00:00Z","fecha_limite_pago":"2099-03-15T00:00:00Z"}}"#).unwrap();
    writeln!(file, r#"{{"op":"submit_payment","movement":1,"auction":1,"user":10,"monto":"680.00","fecha_pago":"2026-03-02T10:00:00Z"}}"#).unwrap();
    writeln!(file, r#"{{"op":"approve_payment","movement":1,"admin":900}}"#).unwrap();
    writeln!(file, r#"{{"op":"set_competition_result","auction":1,"admin":900,"outcome":"perdida"}}"#).unwrap();
    writeln!(file, r#"{{"op":"request_refund","refund":1,"auction":1,"user":10,"monto":"680.00","modo":"mantener_saldo"}}"#).unwrap();
    writeln!(file, r#"{{"op":"manage_refund","refund":1,"admin":900,"decision":"confirmar"}}"#).unwrap();
    writeln!(file, r#"{{"op":"process_refund","refund":1,"admin":900}}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!("almoneda"));
    cmd.arg(file.path());

    // hold released in place: total kept, everything disponible
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("10,680.00,0.00,0.00,680.00"));
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("almoneda"));
    cmd.arg("does-not-exist.jsonl");
    cmd.assert().failure();
}
