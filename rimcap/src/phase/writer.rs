// SPDX-License-Identifier: MIT

use rimio::prelude::*;

use crate::core::{ErrorFlags, FailureKind, TestEvent, Throughput};
use crate::phase::{PhaseContext, PhaseError, PhaseResult};

/// Writes the derived data of every block, in plan order.
///
/// `handles[i]` is the open handle of the `i`-th planned file.
pub(crate) fn write<IO: RimIO>(handles: &mut [IO], ctx: &mut PhaseContext<'_>) -> PhaseResult {
    let plan = ctx.plan;
    let mut rate = Throughput::new();
    let mut buf = Vec::with_capacity(ctx.pattern.len());

    for (info, io) in plan.files().iter().zip(handles.iter_mut()) {
        if ctx.sync {
            io.sync().map_err(|_| {
                PhaseError::fault(
                    ErrorFlags::WRITE,
                    FailureKind::Write,
                    info.index,
                    info.offset,
                    info.size,
                )
            })?;
        }

        for block in &info.blocks {
            let fault = || {
                PhaseError::fault(
                    ErrorFlags::WRITE,
                    FailureKind::Write,
                    info.index,
                    block.abs_offset,
                    block.size,
                )
            };

            ctx.pattern.fill_block(block, &mut buf);
            let started = rate.start();
            io.write_at(block.rel_offset, &buf).map_err(|_| fault())?;
            if ctx.sync {
                io.sync().map_err(|_| fault())?;
            }
            rate.record(started, block.size);

            ctx.progress.bytes_written = block.abs_end();
            ctx.progress.bytes_remaining = ctx.progress.bytes_total - block.abs_end();
            ctx.emit(TestEvent::Written {
                reached: block.abs_end(),
                mb_per_sec: rate.mb_per_sec(),
            });
            ctx.checkpoint()?;
        }
    }

    Ok(())
}
