use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn fast_args(cmd: &mut Command) {
    cmd.arg("--settle-min-ms")
        .arg("100")
        .arg("--settle-max-ms")
        .arg("150")
        .arg("--sweep-ms")
        .arg("20");
}

#[test]
fn test_cli_settles_orders_end_to_end() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        csv,
        "sender, sender_email, recipient_email, recipient_name, amount"
    )
    .unwrap();
    writeln!(csv, "1, alice@example.com, bob@example.com, Bob, 500").unwrap();
    writeln!(csv, "2, carol@example.com, dan@example.com, Dan, 100").unwrap();

    let mut cmd = Command::new(cargo_bin!("remita"));
    cmd.arg(csv.path());
    fast_args(&mut cmd);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "transfer_id,sender_id,recipient_email,amount,traditional_fee,our_fee,savings,status",
        ))
        .stdout(predicate::str::contains(
            "1,1,bob@example.com,500,35.00,4.00,31.00,completed",
        ))
        .stdout(predicate::str::contains(
            "2,2,dan@example.com,100,7.00,0.80,6.20,completed",
        ));
}

#[test]
fn test_cli_reports_invalid_orders_and_continues() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        csv,
        "sender, sender_email, recipient_email, recipient_name, amount"
    )
    .unwrap();
    writeln!(csv, "1, alice@example.com, bob@example.com, Bob, 20000").unwrap();
    writeln!(csv, "1, alice@example.com, bob@example.com, Bob, 50").unwrap();

    let mut cmd = Command::new(cargo_bin!("remita"));
    cmd.arg(csv.path());
    fast_args(&mut cmd);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("invalid amount"))
        .stdout(predicate::str::contains("1,1,bob@example.com,50"))
        .stdout(predicate::str::contains("20000").not());
}
