//! Workload generation: action mix, controls and budgets

use bank_simulator_core::models::BranchId;
use bank_simulator_core::workload::{
    ActionControl, ActionKind, AmountDistribution, WorkloadConfig, WorkloadGenerator,
};
use bank_simulator_core::Action;
use std::collections::BTreeMap;

fn kinds(config: &WorkloadConfig) -> BTreeMap<ActionKind, usize> {
    let mut counts = BTreeMap::new();
    for action in WorkloadGenerator::for_worker(config, 0) {
        *counts.entry(action.kind()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_action_mix_covers_every_kind() {
    let counts = kinds(&WorkloadConfig::new(8, 8, 8192, 100).with_seed(3));
    for kind in [
        ActionKind::Deposit,
        ActionKind::Withdraw,
        ActionKind::Transfer,
        ActionKind::BranchBalance,
        ActionKind::BankBalance,
        ActionKind::Report,
    ] {
        assert!(counts.get(&kind).copied().unwrap_or(0) > 0, "{:?}", kind);
    }
    // Transfers are drawn for three of eight selector values
    assert!(counts[&ActionKind::Transfer] > counts[&ActionKind::Withdraw]);
}

#[test]
fn test_no_bank_balance_control() {
    let config = WorkloadConfig::new(8, 8, 4096, 100).with_control(ActionControl {
        no_bank_balance: true,
        ..Default::default()
    });
    assert!(!kinds(&config).contains_key(&ActionKind::BankBalance));
}

#[test]
fn test_no_cross_transfer_control() {
    let config = WorkloadConfig::new(16, 4, 4096, 100).with_control(ActionControl {
        no_cross_transfer: true,
        ..Default::default()
    });
    for action in WorkloadGenerator::for_worker(&config, 0) {
        if let Action::Transfer { src, dst, .. } = action {
            assert!(src.same_branch(dst));
        }
    }
}

#[test]
fn test_generated_accounts_are_in_range() {
    let config = WorkloadConfig::new(3, 5, 4096, 100).with_seed(77);
    for action in WorkloadGenerator::for_worker(&config, 0) {
        match action {
            Action::Deposit { account, amount } | Action::Withdraw { account, amount } => {
                assert!(account.branch() < BranchId(3));
                assert!(account.subaccount() < 5);
                assert!((0..100).contains(&amount));
            }
            Action::Transfer { src, dst, amount } => {
                assert!(src.subaccount() < 5 && dst.subaccount() < 5);
                assert!(src.branch() < BranchId(3) && dst.branch() < BranchId(3));
                assert!((0..100).contains(&amount));
            }
            Action::BranchBalance { branch } => assert!(branch < BranchId(3)),
            _ => {}
        }
    }
}

#[test]
fn test_failure_injection_zeroes_every_fourth_destination() {
    let config = WorkloadConfig::new(4, 16, 4096, 100)
        .with_seed(8)
        .with_failure_injection(true)
        .with_amount_distribution(AmountDistribution::Uniform);
    for action in WorkloadGenerator::for_worker(&config, 0) {
        match action {
            Action::Deposit { account, amount } if account.subaccount() % 4 == 0 => {
                assert_eq!(amount, 0)
            }
            Action::Transfer { dst, amount, .. } if dst.subaccount() % 4 == 0 => {
                assert_eq!(amount, 0)
            }
            _ => {}
        }
    }
}

#[test]
fn test_budget_split_across_workers() {
    let config = WorkloadConfig::new(4, 4, 4096, 10).with_workers(8);
    assert_eq!(config.commands_per_worker(), 512);
    assert_eq!(config.report_interval(), 128);
    assert_eq!(config.reports_per_worker(), 3);

    for mut generator in WorkloadGenerator::all(&config) {
        let mut budgeted = 0;
        let mut reports = 0;
        loop {
            match generator.next_action() {
                Action::Done => break,
                Action::Report { worker } => {
                    assert_eq!(worker, generator.worker());
                    reports += 1;
                }
                _ => budgeted += 1,
            }
        }
        assert_eq!(budgeted, 512);
        assert_eq!(reports, 3);
    }
}

#[test]
fn test_same_seed_same_actions() {
    let config = WorkloadConfig::new(4, 4, 1024, 10).with_seed(17);
    let a: Vec<Action> = WorkloadGenerator::for_worker(&config, 0).collect();
    let b: Vec<Action> = WorkloadGenerator::for_worker(&config, 0).collect();
    assert_eq!(a, b);

    let other = config.clone().with_seed(18);
    let c: Vec<Action> = WorkloadGenerator::for_worker(&other, 0).collect();
    assert_ne!(a, c);
}
