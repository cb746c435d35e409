use proptest::prelude::*;
use stock_autotrader::error::AppError;
use stock_autotrader::portfolio::{allocate, AllocationTable, Candidate};

#[test]
/// Verifies the reference scenario: capital 10000, returns [5, 10] with
/// closes [100, 50] ranks the 10% name first, splits $5000 each, and sizes
/// 100 and 50 shares in rank order.
fn ranks_and_sizes_reference_scenario() {
    let out = allocate(
        &[Candidate::new("AAA", 100.0, 5.0), Candidate::new("BBB", 50.0, 10.0)],
        10_000.0,
    )
    .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].symbol, "BBB");
    assert_eq!(out[0].rank, 1);
    assert_eq!(out[0].allocation, 5_000.0);
    assert_eq!(out[0].shares, 100);
    assert_eq!(out[1].symbol, "AAA");
    assert_eq!(out[1].allocation, 5_000.0);
    assert_eq!(out[1].shares, 50);
}

#[test]
/// Verifies that a non-positive close fails the whole call.
fn non_positive_close_is_invalid_instrument() {
    for bad in [0.0, -1.0, f64::NAN] {
        let err = allocate(
            &[Candidate::new("OK", 10.0, 1.0), Candidate::new("BAD", bad, 2.0)],
            1_000.0,
        )
        .unwrap_err();
        assert!(
            matches!(err, AppError::InvalidInstrument { ref symbol, .. } if symbol == "BAD"),
            "{:?}",
            err
        );
    }
}

#[test]
/// Verifies the one-share floor when the allocation cannot afford a share.
fn expensive_instrument_still_gets_one_share() {
    let out = allocate(&[Candidate::new("BRK", 600_000.0, 1.0)], 10_000.0).unwrap();
    assert_eq!(out[0].shares, 1);
}

#[test]
/// Verifies that no candidates produce an empty ranking.
fn empty_candidates_allocate_nothing() {
    assert!(allocate(&[], 10_000.0).unwrap().is_empty());
}

#[test]
/// Verifies snapshot lookup by symbol and the carried auxiliary trend.
fn allocation_table_lookup() {
    let out = allocate(
        &[
            Candidate::new("AAA", 10.0, 1.0).with_trend(Some(2.5)),
            Candidate::new("BBB", 20.0, 3.0),
        ],
        900.0,
    )
    .unwrap();
    let table = AllocationTable::new(out, 42);
    assert_eq!(table.allocation_for("AAA"), Some(450.0));
    assert_eq!(table.get("AAA").and_then(|e| e.trend_pct), Some(2.5));
    assert_eq!(table.get("BBB").map(|e| e.rank), Some(1));
    assert_eq!(table.allocation_for("CCC"), None);
    assert!((table.total_allocated() - 900.0).abs() < 1e-9);
}

fn candidates_strategy() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((0.01f64..5_000.0, -50i32..50), 1..20).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (close, ret))| Candidate::new(format!("S{:02}", i), close, ret as f64))
            .collect()
    })
}

proptest! {
    #[test]
    fn allocations_sum_to_capital(
        candidates in candidates_strategy(),
        capital in 1.0f64..1_000_000.0,
    ) {
        let out = allocate(&candidates, capital).unwrap();
        let total: f64 = out.iter().map(|e| e.allocation).sum();
        prop_assert!((total - capital).abs() <= capital * 1e-9);
        prop_assert!(out.iter().all(|e| e.shares >= 1));
    }

    #[test]
    fn ranking_is_descending_and_stable(candidates in candidates_strategy()) {
        let out = allocate(&candidates, 10_000.0).unwrap();
        prop_assert_eq!(out.len(), candidates.len());
        let position = |sym: &str| candidates.iter().position(|c| c.symbol == sym).unwrap();
        for pair in out.windows(2) {
            prop_assert!(pair[0].predicted_return_pct >= pair[1].predicted_return_pct);
            if pair[0].predicted_return_pct == pair[1].predicted_return_pct {
                prop_assert!(position(&pair[0].symbol) < position(&pair[1].symbol));
            }
        }
    }
}

#[test]
/// Verifies the one-share floor only applies to a positive allocation:
/// zero capital sizes every entry at zero shares.
fn zero_capital_allocates_no_shares() {
    let out = allocate(
        &[Candidate::new("AAA", 10.0, 1.0), Candidate::new("BBB", 20.0, 2.0)],
        0.0,
    )
    .unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|e| e.allocation == 0.0 && e.shares == 0));
}
