// SPDX-License-Identifier: MIT

use rimio::prelude::*;

use crate::core::{ErrorFlags, FailureKind, TestEvent, Throughput};
use crate::phase::{PhaseContext, PhaseError, PhaseResult};

/// Reads every block back and compares it with its derived data.
///
/// A short read counts as a mismatch. The first bad block ends the phase.
pub(crate) fn verify<IO: RimIO>(handles: &mut [IO], ctx: &mut PhaseContext<'_>) -> PhaseResult {
    let plan = ctx.plan;
    let mut rate = Throughput::new();
    let mut expected = Vec::with_capacity(ctx.pattern.len());
    let mut scratch = Vec::with_capacity(ctx.pattern.len());

    for (info, io) in plan.files().iter().zip(handles.iter_mut()) {
        if ctx.sync {
            io.sync().map_err(|_| {
                PhaseError::fault(
                    ErrorFlags::VERIFY,
                    FailureKind::Verify,
                    info.index,
                    info.offset,
                    info.size,
                )
            })?;
        }

        for block in &info.blocks {
            let fault = || {
                PhaseError::fault(
                    ErrorFlags::VERIFY,
                    FailureKind::Verify,
                    info.index,
                    block.abs_offset,
                    block.size,
                )
            };

            ctx.pattern.fill_block(block, &mut expected);
            let started = rate.start();
            let same = io
                .matches_at(block.rel_offset, &expected, &mut scratch)
                .map_err(|_| fault())?;
            if !same {
                return Err(fault());
            }
            rate.record(started, block.size);

            *ctx.verified = block.abs_end();
            ctx.emit(TestEvent::Verified {
                reached: block.abs_end(),
                mb_per_sec: rate.mb_per_sec(),
            });
            ctx.checkpoint()?;
        }
    }

    Ok(())
}

#[cfg(all(test, feature = "mem"))]
mod tests {
    use super::*;
    use crate::core::Plan;
    use crate::phase::test_support::Harness;
    use crate::phase::write;
    use rimio::MIB;

    fn open(disk: &SharedMemDisk, plan: &Plan) -> Vec<MemRimIO> {
        plan.files()
            .iter()
            .map(|f| {
                let mut io = MemRimIO::create(disk).unwrap();
                io.set_len(f.size).unwrap();
                io
            })
            .collect()
    }

    fn verified_offsets(events: &[TestEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                TestEvent::Verified { reached, .. } => Some(*reached),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_write_then_verify() {
        let disk = MemDisk::honest(5 * MIB + 300).into_shared();
        let mut h = Harness::new(5 * MIB + 300);
        let mut handles = open(&disk, &h.plan);
        h.run(|ctx| write(&mut handles, ctx)).unwrap();
        h.run(|ctx| verify(&mut handles, ctx)).unwrap();
        assert_eq!(h.verified, 5 * MIB + 300);
        assert_eq!(verified_offsets(&h.events).len(), h.plan.block_count());
    }

    #[test]
    fn test_corrupt_byte_is_reported_at_its_block() {
        let disk = MemDisk::honest(8 * MIB).into_shared();
        let mut h = Harness::new(8 * MIB);
        let mut handles = open(&disk, &h.plan);
        h.run(|ctx| write(&mut handles, ctx)).unwrap();

        disk.borrow_mut()
            .inject(MemFault::CorruptRead { at: 5 * MIB + 4321 });
        let res = h.run(|ctx| verify(&mut handles, ctx));
        match res {
            Err(PhaseError::Fault { flags, detail }) => {
                assert_eq!(flags, ErrorFlags::VERIFY);
                assert_eq!((detail.file_index, detail.offset, detail.size), (2, 5 * MIB, MIB));
            }
            other => panic!("expected a verify fault, got {other:?}"),
        }
        assert_eq!(verified_offsets(&h.events), [MIB, 2 * MIB, 3 * MIB, 4 * MIB, 5 * MIB]);
        assert_eq!(h.verified, 5 * MIB);
    }

    #[test]
    fn test_unwritten_blocks_fail() {
        let disk = MemDisk::honest(2 * MIB).into_shared();
        let mut h = Harness::new(2 * MIB);
        let mut handles = open(&disk, &h.plan);
        let res = h.run(|ctx| verify(&mut handles, ctx));
        assert!(matches!(res, Err(PhaseError::Fault { .. })));
        assert_eq!(h.verified, 0);
    }
}
