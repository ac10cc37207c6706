//! Report engine: threshold logging, period rendezvous and storage bounds

use bank_simulator_core::models::{BranchId, Report};
use bank_simulator_core::{teller, AccountNumber, Bank, LedgerConfig, ReportConfig, ReportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn acct(branch: u32, sub: u32) -> AccountNumber {
    AccountNumber::new(BranchId(branch), sub)
}

#[test]
fn test_threshold_scenario() {
    let report = Report::new(ReportConfig::new(50), 1);
    assert!(!report.record_transfer(acct(0, 0), 30));
    assert!(report.record_transfer(acct(0, 0), 80));

    report.do_report(0, || 0).unwrap();
    let entries = report.entries();
    assert_eq!(entries[0].log.len(), 1);
    assert_eq!(entries[0].log[0].amount, 80);
}

#[test]
fn test_all_workers_share_one_period() {
    let workers = 4;
    let report = Report::new(ReportConfig::new(1), workers);
    let snapshots = AtomicUsize::new(0);

    let periods: Vec<Vec<usize>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let report = &report;
                let snapshots = &snapshots;
                scope.spawn(move || {
                    (0..3)
                        .map(|round| {
                            report.record_transfer(acct(worker as u32, round), 10);
                            let closed = report
                                .do_report(worker, || {
                                    snapshots.fetch_add(1, Ordering::SeqCst);
                                    round as i64
                                })
                                .unwrap();
                            closed.period
                        })
                        .collect()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // One snapshot per period, every worker saw periods 0, 1, 2
    assert_eq!(snapshots.load(Ordering::SeqCst), 3);
    for seen in periods {
        assert_eq!(seen, vec![0, 1, 2]);
    }

    let entries = report.entries();
    assert_eq!(entries.len(), 3);
    for (round, entry) in entries.iter().enumerate() {
        assert_eq!(entry.balance, round as i64);
        assert_eq!(entry.log.len(), workers);
    }
}

#[test]
fn test_storage_exhaustion_reaches_every_worker() {
    let workers = 2;
    let report = Report::new(ReportConfig::new(1).with_max_reports(1), workers);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let report = &report;
                scope.spawn(move || {
                    report.do_report(worker, || 100).unwrap();
                    report.do_report(worker, || 200)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert_eq!(result, Err(ReportError::StorageExhausted { capacity: 1 }));
    }
    assert_eq!(report.num_reports(), 1);
    assert_eq!(report.entries()[0].balance, 100);
}

#[test]
fn test_abandon_releases_waiting_worker() {
    let report = Report::new(ReportConfig::new(1), 2);

    thread::scope(|scope| {
        let waiter = scope.spawn(|| report.do_report(0, || 0));
        // Give the waiter a chance to park before breaking the barrier
        thread::sleep(std::time::Duration::from_millis(20));
        report.abandon();
        assert!(matches!(waiter.join().unwrap(), Err(ReportError::BarrierBroken(_))));
    });

    assert!(matches!(report.do_report(1, || 0), Err(ReportError::BarrierBroken(_))));
    assert_eq!(report.num_reports(), 0);
}

#[test]
fn test_bank_report_snapshot_sees_completed_transfers() {
    let bank = Bank::new(LedgerConfig::new(2, 4, 100), ReportConfig::new(20), 1);
    teller::deposit(&bank, acct(0, 0), 25).unwrap();
    bank.report().record_transfer(acct(0, 0), 25);

    let closed = bank.do_report(0).unwrap();
    assert_eq!(closed.period, 0);

    let entry = &bank.report().entries()[0];
    assert_eq!(entry.balance, 425);
    assert!(!entry.overflowed);
    assert_eq!(entry.log.len(), 1);
}
