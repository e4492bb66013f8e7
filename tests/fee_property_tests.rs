use rand::Rng;
use remita::domain::fees::FeeEngine;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Random amounts in [1, 10000] with two decimal places.
fn sample_amounts(n: usize) -> Vec<Decimal> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| Decimal::new(rng.gen_range(100..=1_000_000), 2))
        .collect()
}

#[test]
fn test_recipient_and_fee_reassemble_the_amount() {
    for amount in sample_amounts(500) {
        let fees = FeeEngine::compute(amount).unwrap();
        let drift = (fees.recipient_receives + fees.our_fee - amount).abs();
        assert!(
            drift <= dec!(0.01),
            "drift {drift} for amount {amount}"
        );
    }
}

#[test]
fn test_savings_always_positive_in_range() {
    for amount in sample_amounts(500) {
        let fees = FeeEngine::compute(amount).unwrap();
        assert!(fees.savings > Decimal::ZERO, "no savings for {amount}");
        let drift = (fees.savings - (fees.traditional_fee - fees.our_fee)).abs();
        assert!(drift <= dec!(0.01), "drift {drift} for amount {amount}");
    }
}

#[test]
fn test_outputs_have_at_most_two_decimals() {
    for amount in sample_amounts(500) {
        let fees = FeeEngine::compute(amount).unwrap();
        for value in [
            fees.traditional_fee,
            fees.interledger_fee,
            fees.our_fee,
            fees.savings,
            fees.recipient_receives,
        ] {
            assert!(value.scale() <= 2, "{value} has more than 2 decimals");
        }
        assert!(fees.savings_percentage.scale() <= 1);
    }
}
