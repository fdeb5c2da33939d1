//! End-to-end cascade scenarios and invariants

use lending_simulation::{
    run_simulation, CascadeOutcome, Cohort, LiquidationEngine, PopulationGenerator,
    ReserveParameters, RiskParameters, RiskStatus, SimulationConfig, DEFAULT_SEED,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_default_scenario_converges_quickly() {
    let result = run_simulation(SimulationConfig::default(), DEFAULT_SEED).unwrap();
    let summary = result.summary();

    assert!(summary.outcome.is_converged());
    assert!(summary.rounds > 0);
    assert!(summary.rounds < 100, "took {} rounds", summary.rounds);
    assert!(summary.total_bad_debt_usd >= 0.0);
    assert_eq!(
        summary.risk_status,
        RiskStatus::from_bad_debt(summary.total_bad_debt_usd)
    );

    let stages: Vec<&str> = result.snapshots().iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages[0], "Post-Shock");
    for (i, stage) in stages[1..].iter().enumerate() {
        assert_eq!(*stage, format!("Round {}", i + 1));
    }
}

#[test]
fn test_zero_price_drop_has_only_post_shock_stage() {
    let config = SimulationConfig::default().with_price_drop(0.0);
    let result = run_simulation(config, DEFAULT_SEED).unwrap();

    assert_eq!(result.snapshots().len(), 1);
    assert_eq!(result.snapshots()[0].stage, "Post-Shock");
    assert!(result.rounds().is_empty());
    assert_eq!(result.outcome(), CascadeOutcome::Settled);
}

#[test]
fn test_single_whale_half_price_drop() {
    let config = SimulationConfig::default()
        .with_users(1, 1.0)
        .with_price_drop(0.5);
    let result = run_simulation(config, DEFAULT_SEED).unwrap();

    let whale = &result.positions()[0];
    assert_eq!(whale.cohort(), Cohort::Whale);

    // A whale opens at HF >= 1.2 and halving the price puts it below 0.9
    let first = &result.rounds()[0];
    assert_eq!(first.liquidated_ids, vec![0]);
    assert_eq!(first.partial_liquidations, 1);
    assert!((first.debt_repaid - whale.initial_debt() / 2.0).abs() < 1e-6);
    assert!((first.price_before - 1000.0).abs() < 1e-9);
}

#[test]
fn test_same_seed_reproduces_run() {
    let config = SimulationConfig::default().with_price_drop(0.4);
    let a = run_simulation(config.clone(), 7).unwrap();
    let b = run_simulation(config.clone(), 7).unwrap();
    let c = run_simulation(config, 8).unwrap();

    assert_eq!(a.snapshots(), b.snapshots());
    assert_eq!(a.summary(), b.summary());
    assert_eq!(a.log(), b.log());
    assert_ne!(a.positions(), c.positions());
}

#[test]
fn test_total_collapse_shock_wipes_everyone_out() {
    let config = SimulationConfig::default()
        .with_users(100, 0.05)
        .with_price_drop(1.0);
    let result = run_simulation(config, DEFAULT_SEED).unwrap();

    assert!(result.summary().final_price > 0.0);
    assert_eq!(result.summary().risk_status, RiskStatus::Critical);
    assert!(result
        .positions()
        .iter()
        .filter(|p| p.initial_debt() > 0.0)
        .all(|p| p.is_terminal()));
}

#[test]
fn test_result_serializes_to_json() {
    let result = run_simulation(SimulationConfig::default().with_users(50, 0.02), 3).unwrap();
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json["snapshots"].as_array().unwrap().len(),
        result.snapshots().len()
    );
    assert!(json["summary"]["risk_status"].is_string());
    assert_eq!(json["config"]["num_users"], 50);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_liquidation_invariants_hold_every_round(
        num_users in 1usize..60,
        whale_concentration in 0.0f64..=1.0,
        drop in 0.0f64..0.9,
        depth in 10_000.0f64..10_000_000.0,
        seed in any::<u64>(),
    ) {
        let config = SimulationConfig::default()
            .with_users(num_users, whale_concentration)
            .with_liquidity_depth(depth);
        let opening = ReserveParameters::new("ETH", config.start_price, RiskParameters::default());
        let mut positions = PopulationGenerator::new(&config)
            .generate(&opening, &mut ChaCha8Rng::seed_from_u64(seed));

        for position in &positions {
            prop_assert!(position.health_factor(&opening) >= 1.01 - 1e-9);
        }

        let mut reserve = ReserveParameters::new(
            "ETH",
            config.start_price * (1.0 - drop),
            RiskParameters::default(),
        );
        let mut engine = LiquidationEngine::new(depth);

        for _ in 0..50 {
            let selected = LiquidationEngine::select_liquidatable(&positions, &reserve);
            for &idx in &selected {
                prop_assert!(positions[idx].health_factor(&reserve) < 1.0);
                prop_assert!(!positions[idx].is_terminal());
            }
            for pair in selected.windows(2) {
                prop_assert!(positions[pair[0]].debt() >= positions[pair[1]].debt());
            }

            let before = positions.clone();
            let Some(report) = engine.run_round(&mut positions, &mut reserve) else {
                break;
            };

            let expected_ids: Vec<usize> = selected.iter().map(|&i| before[i].id()).collect();
            prop_assert_eq!(&report.liquidated_ids, &expected_ids);
            prop_assert!(reserve.price() > 0.0);
            prop_assert!(reserve.price() <= report.price_before);

            for (prev, now) in before.iter().zip(&positions) {
                prop_assert!(now.collateral() <= prev.collateral());
                prop_assert!(now.debt() <= prev.debt());
                prop_assert!(now.bad_debt() >= prev.bad_debt());
                if prev.bad_debt() > 0.0 {
                    prop_assert_eq!(now.bad_debt(), prev.bad_debt());
                }
                if prev.is_terminal() {
                    prop_assert_eq!(now, prev);
                }
            }

            if report.slippage_fraction < 0.0001 {
                break;
            }
        }
    }

    #[test]
    fn prop_runs_are_reproducible(
        num_users in 1usize..40,
        drop in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let config = SimulationConfig::default()
            .with_users(num_users, 0.05)
            .with_price_drop(drop);
        let a = run_simulation(config.clone(), seed).unwrap();
        let b = run_simulation(config, seed).unwrap();

        prop_assert_eq!(a.snapshots(), b.snapshots());
        prop_assert_eq!(a.summary(), b.summary());
        prop_assert!(a.summary().total_bad_debt_usd >= 0.0);
        prop_assert_eq!(a.snapshots().len(), a.rounds().len() + 1);
    }
}
