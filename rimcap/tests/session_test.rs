// SPDX-License-Identifier: MIT

use std::path::Path;

use rimcap::prelude::*;
use rimio::MIB;
use rimio::prelude::{MemDisk, MemFault, Overflow, RimIOSetLen};

fn config() -> TesterConfig {
    TesterConfig::default()
        .with_block_size(MIB)
        .with_file_size(4 * MIB)
        .with_seed(0xC0FFEE)
}

fn tester(disk: MemDisk) -> VolumeTester<MemVolume> {
    VolumeTester::new(MemVolume::new("/mem", disk), config()).unwrap()
}

fn run(tester: &mut VolumeTester<MemVolume>) -> (TestOutcome, Vec<TestEvent>) {
    let mut events = vec![];
    let outcome = tester.start(&mut |e: &TestEvent| events.push(e.clone()));
    check_sequence(&events);
    (outcome, events)
}

/// Exactly one `Finished`, last, right after exactly one verdict.
fn check_sequence(events: &[TestEvent]) {
    assert_eq!(events.last(), Some(&TestEvent::Finished));
    let finished = events.iter().filter(|e| **e == TestEvent::Finished).count();
    assert_eq!(finished, 1);

    let verdicts: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, TestEvent::Succeeded | TestEvent::Failed(_)))
        .collect();
    assert_eq!(verdicts.len(), 1, "one verdict expected: {events:?}");
    assert!(matches!(
        events[events.len() - 2],
        TestEvent::Succeeded | TestEvent::Failed(_)
    ));
}

fn written(events: &[TestEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            TestEvent::Written { reached, .. } => Some(*reached),
            _ => None,
        })
        .collect()
}

fn assert_clean(tester: &VolumeTester<MemVolume>) {
    assert!(tester.volume().file_names().is_empty());
    assert_eq!(tester.volume().disk().borrow().allocated(), 0);
    assert!(tester.conflict_files().is_empty());
    assert_eq!(tester.phase(), SessionPhase::CleanedUp);
}

#[test]
fn test_honest_volume_succeeds() {
    let mut t = tester(MemDisk::honest(9 * MIB));
    let (outcome, events) = run(&mut t);

    assert!(outcome.succeeded(), "{outcome:?}");
    assert!(outcome.errors.is_unknown());
    assert_eq!(outcome.failure, None);
    assert_eq!(outcome.bytes_total, 9 * MIB);
    assert_eq!(outcome.bytes_written, 9 * MIB);
    assert_eq!(outcome.bytes_verified, 9 * MIB);
    assert_eq!(outcome.usable_bytes(), 9 * MIB);
    assert_eq!(outcome.seed, Some(0xC0FFEE));
    assert!(outcome.io.write_bytes >= 9 * MIB);
    assert!(outcome.io.read_bytes >= 9 * MIB);

    assert_eq!(events[0], TestEvent::InitializationStarted { total: 9 * MIB });
    let init = events
        .iter()
        .filter(|e| matches!(e, TestEvent::Initialized { .. }))
        .count();
    assert_eq!(init, 3);
    assert_eq!(written(&events), (1..=9).map(|i| i * MIB).collect::<Vec<_>>());

    let order: Vec<usize> = [
        TestEvent::WriteStarted,
        TestEvent::VerifyStarted,
        TestEvent::Succeeded,
    ]
    .iter()
    .map(|m| events.iter().position(|e| e == m).unwrap())
    .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(t.progress().bytes_remaining, 0);
    assert_clean(&t);
}

#[test]
fn test_short_write_reports_block() {
    let disk = MemDisk::honest(12 * MIB).with_fault(MemFault::ShortWrite { at: 6 * MIB + 5 });
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.phase, SessionPhase::Failed);
    assert_eq!(outcome.errors, ErrorFlags::WRITE);
    assert_eq!(outcome.usable_bytes(), 6 * MIB);
    assert_eq!(written(&events), [MIB, 2 * MIB, 3 * MIB, 4 * MIB, 5 * MIB, 6 * MIB]);

    let n = events.len();
    assert_eq!(
        events[n - 3],
        TestEvent::WriteFailed {
            offset: 6 * MIB,
            size: MIB
        }
    );
    assert_eq!(events[n - 2], TestEvent::Failed(ErrorFlags::WRITE));
    assert!(!events.contains(&TestEvent::VerifyStarted));
    assert_clean(&t);
}

#[test]
fn test_corrupt_read_reports_block() {
    let disk = MemDisk::honest(12 * MIB).with_fault(MemFault::CorruptRead { at: 2 * MIB + 100 });
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.errors, ErrorFlags::VERIFY);
    assert_eq!(outcome.bytes_written, 12 * MIB);
    assert_eq!(outcome.bytes_verified, 2 * MIB);
    assert!(events.contains(&TestEvent::VerifyFailed {
        offset: 2 * MIB,
        size: MIB
    }));
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::Verify);
    assert_eq!(failure.file_index, 0);
    assert_clean(&t);
}

#[test]
fn test_cancel_during_write() {
    let mut t = tester(MemDisk::honest(12 * MIB));
    let token = t.cancel_token();
    let mut events = vec![];
    let outcome = t.start(&mut |e: &TestEvent| {
        if let TestEvent::Written { reached, .. } = e
            && *reached == 3 * MIB
        {
            token.cancel();
        }
        events.push(e.clone());
    });
    check_sequence(&events);

    assert!(outcome.canceled());
    assert!(outcome.errors.is_aborted());
    assert_eq!(outcome.bytes_written, 3 * MIB);
    assert_eq!(written(&events).last(), Some(&(3 * MIB)));

    let n = events.len();
    assert_eq!(events[n - 3], TestEvent::Canceled);
    assert_eq!(events[n - 2], TestEvent::Failed(ErrorFlags::ABORTED));
    assert_clean(&t);
    assert!(!token.is_canceled(), "token is reset once the run is over");
}

fn run_canceling_on(
    t: &mut VolumeTester<MemVolume>,
    at: TestEvent,
) -> (TestOutcome, Vec<TestEvent>) {
    let token = t.cancel_token();
    let mut events = vec![];
    let outcome = t.start(&mut |e: &TestEvent| {
        let hit = *e == at;
        events.push(e.clone());
        if hit {
            token.cancel();
        }
    });
    check_sequence(&events);
    (outcome, events)
}

#[test]
fn test_cancel_during_second_quick_test_pass() {
    let mut t = tester(MemDisk::honest(8 * MIB));
    let last = t.plan().unwrap().total();
    let token = t.cancel_token();
    let mut events = vec![];
    let outcome = t.start(&mut |e: &TestEvent| {
        if let TestEvent::Initialized { reached, .. } = e
            && *reached == last
        {
            token.cancel();
        }
        events.push(e.clone());
    });
    check_sequence(&events);

    assert!(outcome.canceled());
    assert_eq!(outcome.errors, ErrorFlags::ABORTED);
    assert!(!events.contains(&TestEvent::WriteStarted));
    assert_eq!(outcome.bytes_written, 0);
    let n = events.len();
    assert!(matches!(events[n - 4], TestEvent::Initialized { reached, .. } if reached == 8 * MIB));
    assert_eq!(events[n - 3], TestEvent::Canceled);
    assert_clean(&t);
}

#[test]
fn test_cancel_during_verify() {
    let mut t = tester(MemDisk::honest(8 * MIB));
    let (outcome, events) = run_canceling_on(&mut t, TestEvent::VerifyStarted);

    assert!(outcome.canceled());
    assert_eq!(outcome.errors, ErrorFlags::ABORTED);
    assert_eq!(outcome.bytes_written, 8 * MIB);
    // The first block is checked before the checkpoint sees the request.
    assert_eq!(outcome.bytes_verified, MIB);
    assert_eq!(outcome.usable_bytes(), 0);
    let n = events.len();
    assert_eq!(
        events[n - 3..],
        [
            TestEvent::Canceled,
            TestEvent::Failed(ErrorFlags::ABORTED),
            TestEvent::Finished,
        ]
    );
    assert_clean(&t);
}

#[test]
fn test_fault_while_cancel_pending_keeps_both_flags() {
    let disk = MemDisk::honest(8 * MIB).with_fault(MemFault::ShortWrite { at: 10 });
    let mut t = tester(disk);
    let (outcome, events) = run_canceling_on(&mut t, TestEvent::WriteStarted);

    assert_eq!(outcome.errors, ErrorFlags::WRITE | ErrorFlags::ABORTED);
    assert_eq!(outcome.phase, SessionPhase::Failed);
    let n = events.len();
    assert_eq!(
        events[n - 3..],
        [
            TestEvent::WriteFailed {
                offset: 0,
                size: MIB
            },
            TestEvent::Failed(ErrorFlags::WRITE | ErrorFlags::ABORTED),
            TestEvent::Finished,
        ]
    );
    assert!(!events.contains(&TestEvent::Canceled));
    assert_clean(&t);
    assert!(!t.cancel_token().is_canceled());
}

#[test]
fn test_cancel_requested_before_start() {
    let mut t = tester(MemDisk::honest(8 * MIB));
    t.cancel();
    let (outcome, events) = run(&mut t);

    assert!(outcome.canceled());
    assert_eq!(
        events,
        [
            TestEvent::InitializationStarted { total: 8 * MIB },
            TestEvent::Canceled,
            TestEvent::Failed(ErrorFlags::ABORTED),
            TestEvent::Finished,
        ]
    );
    assert_eq!(outcome.io.writes, 0);
    assert_clean(&t);
}

#[test]
fn test_conflicts_block_the_run() {
    let vol = MemVolume::new("/mem", MemDisk::honest(8 * MIB))
        .with_entry("CAPACITYTESTER0", false)
        .with_entry("photo.jpg", false);
    let mut t = VolumeTester::new(vol, config()).unwrap();
    assert_eq!(t.conflict_files(), ["CAPACITYTESTER0"]);
    assert!(matches!(t.preflight(), Err(CapError::Conflicts(_))));

    let (outcome, events) = run(&mut t);
    assert_eq!(
        events,
        [TestEvent::Failed(ErrorFlags::CONFLICT), TestEvent::Finished]
    );
    assert_eq!(outcome.phase, SessionPhase::Failed);
    assert_eq!(outcome.bytes_total, 0);
    assert_eq!(t.volume().disk().borrow().allocated(), 0);
    assert_eq!(t.root_files().len(), 2);
}

#[test]
fn test_full_volume() {
    let mut t = tester(MemDisk::honest(4 * MIB));
    let mut data = t.volume_mut().create(Path::new("/mem/data.bin")).unwrap();
    data.set_len(4 * MIB).unwrap();
    assert_eq!(t.bytes_available(), 0);

    let (outcome, events) = run(&mut t);
    assert_eq!(outcome.errors, ErrorFlags::FULL);
    assert_eq!(events, [TestEvent::Failed(ErrorFlags::FULL), TestEvent::Finished]);
    assert_eq!(t.volume().file_names(), ["data.bin"]);
}

#[test]
fn test_invalid_mountpoint() {
    let mut t = tester(MemDisk::honest(4 * MIB));
    t.volume_mut().set_valid(false);
    let (outcome, events) = run(&mut t);
    assert!(outcome.errors.is_unknown());
    assert_eq!(outcome.phase, SessionPhase::Failed);
    assert_eq!(events, [TestEvent::Failed(ErrorFlags::UNKNOWN), TestEvent::Finished]);
}

#[test]
fn test_discarding_fake_is_caught_by_quick_test() {
    let disk = MemDisk::new(16 * MIB, 5 * MIB, Overflow::Discard);
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.errors, ErrorFlags::VERIFY);
    // File 1 is grown and trailed, then fails its own quick test.
    assert!(matches!(
        events.as_slice(),
        [
            TestEvent::InitializationStarted { total },
            TestEvent::Initialized { reached: r0, .. },
            TestEvent::Initialized { reached: r1, .. },
            TestEvent::VerifyFailed { offset, size },
            TestEvent::Failed(ErrorFlags::VERIFY),
            TestEvent::Finished,
        ] if *total == 16 * MIB
            && *r0 == 4 * MIB
            && *r1 == 8 * MIB
            && (*offset, *size) == (4 * MIB, 4 * MIB)
    ), "{events:?}");
    assert_eq!(outcome.usable_bytes(), 4 * MIB);
    assert_clean(&t);
}

#[test]
fn test_wrapping_fake_is_caught_by_second_pass() {
    let disk = MemDisk::new(16 * MIB, 8 * MIB, Overflow::Wrap);
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.errors, ErrorFlags::VERIFY);
    let init = events
        .iter()
        .filter(|e| matches!(e, TestEvent::Initialized { .. }))
        .count();
    assert_eq!(init, 4);
    assert!(events.contains(&TestEvent::VerifyFailed {
        offset: 0,
        size: 4 * MIB
    }));
    assert_clean(&t);
}

#[test]
fn test_wrapping_fake_is_caught_by_verifier() {
    let disk = MemDisk::new(8 * MIB, 7 * MIB, Overflow::Wrap);
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.errors, ErrorFlags::VERIFY);
    assert_eq!(written(&events).last(), Some(&(8 * MIB)));
    assert!(events.contains(&TestEvent::VerifyFailed {
        offset: 0,
        size: MIB
    }));
    assert_clean(&t);
}

#[test]
fn test_denied_create() {
    let disk = MemDisk::honest(8 * MIB).with_fault(MemFault::DenyCreate);
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.errors, ErrorFlags::CREATE | ErrorFlags::PERMISSIONS);
    assert!(events.contains(&TestEvent::CreateFailed {
        file_index: 0,
        offset: 0
    }));
    assert_clean(&t);
}

#[test]
fn test_denied_resize() {
    let disk = MemDisk::honest(8 * MIB).with_fault(MemFault::DenyResize);
    let mut t = tester(disk);
    let (outcome, events) = run(&mut t);

    assert_eq!(outcome.errors, ErrorFlags::WRITE | ErrorFlags::RESIZE);
    assert!(events.contains(&TestEvent::WriteFailed {
        offset: 0,
        size: 4 * MIB
    }));
    assert_clean(&t);
}

#[test]
fn test_sync_can_be_disabled() {
    let vol = MemVolume::new("/mem", MemDisk::honest(4 * MIB));
    let mut t = VolumeTester::new(vol, config().with_sync(false)).unwrap();
    let (outcome, _) = run(&mut t);
    assert!(outcome.succeeded());
    assert_eq!(outcome.io.syncs, 0);

    let mut t = tester(MemDisk::honest(4 * MIB));
    let (outcome, _) = run(&mut t);
    // One per file and one per block, in both write and verify.
    assert_eq!(outcome.io.syncs, 2 * (1 + 4));
}

#[test]
fn test_runs_are_independent() {
    let mut t = tester(MemDisk::honest(6 * MIB));
    let (first, _) = run(&mut t);
    let (second, _) = run(&mut t);
    assert!(first.succeeded() && second.succeeded());
    assert_eq!(first.bytes_total, second.bytes_total);
    assert_clean(&t);
}

#[test]
fn test_max_bytes_limits_the_plan() {
    let vol = MemVolume::new("/mem", MemDisk::honest(64 * MIB));
    let mut t = VolumeTester::new(vol, config().with_max_bytes(5 * MIB + 7)).unwrap();
    let (outcome, _) = run(&mut t);
    assert!(outcome.succeeded());
    assert_eq!(outcome.bytes_total, 5 * MIB + 7);
    assert_eq!(outcome.bytes_verified, 5 * MIB + 7);
}
