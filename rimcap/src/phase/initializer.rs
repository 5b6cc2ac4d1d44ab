// SPDX-License-Identifier: MIT

//! File materialization and quick test.
//!
//! Every planned file is created, tagged at offset 0, grown to its planned
//! size and terminated by [`SENTINEL`]; the tag and the trailer are read
//! back right away. Once all files exist, a second pass re-reads every
//! tag and trailer: a medium smaller than advertised has by then dropped
//! or overwritten the early files.

use rimio::prelude::*;

use crate::core::{ErrorFlags, FailureKind, FileInfo, SENTINEL, TestEvent, Throughput};
use crate::phase::{PhaseContext, PhaseError, PhaseResult, TestFiles};
use crate::volume::Volume;

pub(crate) fn initialize<V: Volume>(
    files: &mut TestFiles<'_, V>,
    ctx: &mut PhaseContext<'_>,
) -> PhaseResult {
    let plan = ctx.plan;
    let mut rate = Throughput::new();
    let mut scratch = Vec::new();

    for info in plan.files() {
        ctx.checkpoint()?;

        let started = rate.start();
        let io = files.create(&info.path).map_err(|e| {
            let mut flags = ErrorFlags::CREATE;
            if e.is_permission() {
                flags |= ErrorFlags::PERMISSIONS;
            }
            file_fault(flags, FailureKind::Create, info)
        })?;
        prepare(io, info)?;
        rate.record(started, info.size);

        ctx.emit(TestEvent::Initialized {
            reached: info.end(),
            mb_per_sec: rate.mb_per_sec(),
        });
        quick_test(io, info, &mut scratch)?;
    }

    for (info, io) in plan.files().iter().zip(files.handles_mut()) {
        ctx.checkpoint()?;
        quick_test(io, info, &mut scratch)?;
    }

    Ok(())
}

/// Leading tag bytes that fit before the trailer.
fn head_tag(info: &FileInfo) -> &[u8] {
    let room = (info.size - 1).min(info.tag.len() as u64) as usize;
    &info.tag[..room]
}

fn file_fault(flags: ErrorFlags, kind: FailureKind, info: &FileInfo) -> PhaseError {
    PhaseError::fault(flags, kind, info.index, info.offset, info.size)
}

fn prepare<IO: RimIOSetLen>(io: &mut IO, info: &FileInfo) -> PhaseResult {
    let tag = head_tag(info);
    if !tag.is_empty() {
        io.write_at(0, tag)
            .map_err(|_| file_fault(ErrorFlags::WRITE, FailureKind::Write, info))?;
    }
    io.set_len(info.size).map_err(|_| {
        file_fault(
            ErrorFlags::WRITE | ErrorFlags::RESIZE,
            FailureKind::Write,
            info,
        )
    })?;
    io.write_u8_at(info.size - 1, SENTINEL)
        .map_err(|_| file_fault(ErrorFlags::WRITE, FailureKind::Write, info))
}

fn quick_test<IO: RimIO>(io: &mut IO, info: &FileInfo, scratch: &mut Vec<u8>) -> PhaseResult {
    let trailer_ok = io
        .read_u8_at(info.size - 1)
        .is_ok_and(|b| b == SENTINEL);
    let tag_ok = io
        .matches_at(0, head_tag(info), scratch)
        .unwrap_or(false);

    if trailer_ok && tag_ok {
        Ok(())
    } else {
        Err(file_fault(ErrorFlags::VERIFY, FailureKind::Verify, info))
    }
}
