//! The mirrored, bounded FIFO that connects processing nodes in a media
//! streaming pipeline.
//!
//! A [`Fifo<T>`] is owned by a node (a demuxer, decoder, filter, encoder, or
//! muxer) and pushed to and pulled from by that node's threads. FIFOs can be
//! *mirrored*: pushing to a source FIFO also, atomically, pushes to every
//! FIFO it has been mirrored into, before the push returns. This is how a
//! single pipeline stage fans its output out to several downstream
//! consumers.
//!
//! `T` is expected to be cheap to clone (typically `Arc<Frame>` or
//! `Arc<Packet>`, see [`crate::media`]) — the FIFO does not move items, it
//! clones handles to them.

mod buffer_list;

use std::collections::VecDeque;
use std::fmt;

#[cfg(not(loom))]
use std::sync::{Arc, Condvar, Mutex};

#[cfg(loom)]
use loom::sync::{Arc, Condvar, Mutex};

use tracing::debug;

use self::buffer_list::BufferList;
use crate::error::FifoError;
use crate::flags::BlockFlags;

/// Local queue capacity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxQueued {
    /// No bound; pushes never block or fail for capacity reasons.
    Unbounded,
    /// The FIFO never buffers locally; pushes only fan out to destinations.
    Never,
    /// Bounded at `n + 1` items.
    Bounded(usize),
}

impl MaxQueued {
    fn to_raw(self) -> i64 {
        match self {
            MaxQueued::Unbounded => -1,
            MaxQueued::Never => 0,
            MaxQueued::Bounded(n) => n as i64,
        }
    }

    fn from_raw(raw: i64) -> MaxQueued {
        match raw {
            i64::MIN..=-1 => MaxQueued::Unbounded,
            0 => MaxQueued::Never,
            n => MaxQueued::Bounded(n as usize),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullMode {
    Pop,
    Peek,
}

struct FifoState<T> {
    queued: VecDeque<T>,
    max_queued: i64,
    block_flags: BlockFlags,
    poked: bool,
}

fn is_full_locked<T>(state: &FifoState<T>) -> bool {
    match state.max_queued {
        0 => true,
        n if n > 0 => state.queued.len() as i64 > n + 1,
        _ => false,
    }
}

/// A thread-safe, reference-counted, fan-out FIFO.
///
/// Always shared as `Arc<Fifo<T>>`: creating the FIFO, mirroring it, and
/// pushing to or pulling from it all take the handle by reference, the way
/// a node would hold one strong reference per FIFO it owns plus one per
/// mirror link. Dropping the last `Arc` frees every item still queued and
/// unreferences (without destroying) every mirrored peer; call
/// [`Fifo::unmirror_all`] first if you need blocked consumers on the other
/// end of a mirror to wake up as part of the teardown.
pub struct Fifo<T> {
    opaque: String,
    state: Mutex<FifoState<T>>,
    cond_in: Condvar,
    cond_out: Condvar,
    dests: BufferList<T>,
    sources: BufferList<T>,
}

impl<T> Fifo<T> {
    /// Creates a new, unmirrored FIFO. `opaque` identifies the owning node
    /// for logging only.
    pub fn new(
        opaque: impl Into<String>,
        max_queued: MaxQueued,
        block_flags: BlockFlags,
    ) -> Arc<Fifo<T>> {
        Arc::new(Fifo {
            opaque: opaque.into(),
            state: Mutex::new(FifoState {
                queued: VecDeque::new(),
                max_queued: max_queued.to_raw(),
                block_flags,
                poked: false,
            }),
            cond_in: Condvar::new(),
            cond_out: Condvar::new(),
            dests: BufferList::new(),
            sources: BufferList::new(),
        })
    }

    /// Number of items currently queued locally.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().queued.len()
    }

    /// The FIFO's current capacity policy.
    pub fn max_size(&self) -> MaxQueued {
        MaxQueued::from_raw(self.state.lock().unwrap().max_queued)
    }

    /// True iff a push would currently have to block or fail for capacity
    /// reasons. Note this uses the same strict `len() > n + 1` predicate
    /// that `push` blocks on, so a push can legally land while `is_full`
    /// already reports `true` (see the design notes on `max_queued`).
    pub fn is_full(&self) -> bool {
        is_full_locked(&self.state.lock().unwrap())
    }

    /// Reassigns the capacity policy. Does not retroactively drop items
    /// already queued; if the new capacity is smaller than the current
    /// length, subsequent pushes block or fail per the block flags.
    pub fn set_max_queued(&self, max_queued: MaxQueued) {
        self.state.lock().unwrap().max_queued = max_queued.to_raw();
    }

    /// Reassigns the block flags.
    pub fn set_block_flags(&self, flags: BlockFlags) {
        self.state.lock().unwrap().block_flags = flags;
    }

    /// Wakes a consumer blocked in `pop`/`peek` on this FIFO without
    /// delivering an item. Consumers that want to observe the poke (rather
    /// than just re-entering the wait) must pass `PULL_POKE`.
    pub fn poke(this: &Arc<Fifo<T>>) {
        debug!(fifo = %this.opaque, "poke");
        this.state.lock().unwrap().poked = true;
        this.cond_in.notify_one();
    }

    /// Mirrors `src` into `dst`: every future push to `src` also pushes to
    /// `dst`, in the order destinations were mirrored.
    pub fn mirror(dst: &Arc<Fifo<T>>, src: &Arc<Fifo<T>>) {
        debug!(dst = %dst.opaque, src = %src.opaque, "mirror");
        dst.sources.append(Arc::clone(src));
        src.dests.append(Arc::clone(dst));
    }

    /// Detaches a single mirror link established by [`Fifo::mirror`].
    pub fn unmirror(dst: &Arc<Fifo<T>>, src: &Arc<Fifo<T>>) {
        debug!(dst = %dst.opaque, src = %src.opaque, "unmirror");
        dst.sources.pop_identity(src);
        src.dests.pop_identity(dst);
    }

    /// Detaches every source and destination mirrored with `this`. For each
    /// detached destination, wakes its `cond_in` so a consumer blocked
    /// pulling from it re-checks its state — the operation a node performs
    /// before tearing itself down mid-stream so downstream consumers don't
    /// hang waiting on a source that is about to disappear.
    pub fn unmirror_all(this: &Arc<Fifo<T>>) {
        debug!(fifo = %this.opaque, "unmirror_all");

        for src in this.sources.drain() {
            src.dests.pop_identity(this);
        }

        for dst in this.dests.drain() {
            dst.sources.pop_identity(this);
            dst.cond_in.notify_one();
        }
    }
}

impl<T: Clone> Fifo<T> {
    /// Pushes `item` onto `dst`, fanning it out to every FIFO mirrored from
    /// `dst` before returning.
    ///
    /// `item = None` is a legitimate sentinel (e.g. end-of-stream): it still
    /// fans out to every destination but is never stored locally, regardless
    /// of capacity.
    ///
    /// The lock on `dst` is held across the entire fan-out, so the item
    /// becomes visible atomically across the whole mirror tree rooted at
    /// `dst`. This requires the mirror graph to be acyclic — the FIFO does
    /// not detect cycles, and a cyclic graph deadlocks here.
    pub fn push(dst: &Arc<Fifo<T>>, item: Option<T>) -> Result<(), FifoError> {
        let mut guard = dst.state.lock().unwrap();

        if guard.max_queued != 0 {
            if let Some(it) = &item {
                if guard.max_queued > 0 && guard.queued.len() as i64 > guard.max_queued + 1 {
                    if !guard.block_flags.contains(BlockFlags::BLOCK_MAX_OUTPUT) {
                        return Err(FifoError::QueueFull);
                    }

                    // A single wait, not a loop: one wake is taken as permission to
                    // proceed even if the queue is still nominally over capacity.
                    guard = dst.cond_out.wait(guard).unwrap();
                }

                guard
                    .queued
                    .try_reserve(1)
                    .map_err(|_| FifoError::OutOfMemory)?;
                guard.queued.push_back(it.clone());
            }
        }

        dst.cond_in.notify_one();

        let snapshot = dst.dests.snapshot();
        let mut first_err = None;

        for d in &snapshot {
            match Fifo::push(d, item.clone()) {
                Ok(()) => {}
                Err(FifoError::OutOfMemory) => return Err(FifoError::OutOfMemory),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        drop(guard);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn pull(src: &Arc<Fifo<T>>, mode: PullMode, flags: BlockFlags) -> Result<T, FifoError> {
        let mut guard = src.state.lock().unwrap();

        while guard.queued.is_empty() {
            let block_no_input = guard.block_flags.contains(BlockFlags::BLOCK_NO_INPUT);

            if !block_no_input || flags.contains(BlockFlags::PULL_NO_BLOCK) {
                return Err(FifoError::TryAgain);
            }

            if !guard.poked {
                guard = src.cond_in.wait(guard).unwrap();
            }

            // set_block_flags can change the policy while we were waiting; the
            // loop condition above re-reads it on every iteration.
            if flags.contains(BlockFlags::PULL_POKE) && guard.poked {
                guard.poked = false;
                return Err(FifoError::TryAgain);
            }

            guard.poked = false;
        }

        match mode {
            PullMode::Peek => Ok(guard.queued.front().unwrap().clone()),
            PullMode::Pop => {
                let item = guard.queued.pop_front().unwrap();
                if guard.max_queued > 0 {
                    src.cond_out.notify_one();
                }
                Ok(item)
            }
        }
    }

    /// Pops the oldest item, blocking per the FIFO's configured block flags.
    ///
    /// Returns `None` if the queue is empty and the configured policy says
    /// not to block right now. A returned `None` is always this try-again
    /// case: a pushed `None` item never reaches the queue in the first
    /// place (see [`Fifo::push`]).
    pub fn pop(src: &Arc<Fifo<T>>) -> Option<T> {
        Fifo::pop_flags(src, BlockFlags::empty()).ok()
    }

    /// Clones the oldest item without removing it, blocking per the FIFO's
    /// configured block flags.
    pub fn peek(src: &Arc<Fifo<T>>) -> Option<T> {
        Fifo::peek_flags(src, BlockFlags::empty()).ok()
    }

    /// Pops the oldest item, or returns [`FifoError::TryAgain`] per `flags`
    /// (in addition to the FIFO's own configured block flags).
    pub fn pop_flags(src: &Arc<Fifo<T>>, flags: BlockFlags) -> Result<T, FifoError> {
        Fifo::pull(src, PullMode::Pop, flags)
    }

    /// Clones the oldest item without removing it, or returns
    /// [`FifoError::TryAgain`] per `flags`.
    pub fn peek_flags(src: &Arc<Fifo<T>>, flags: BlockFlags) -> Result<T, FifoError> {
        Fifo::pull(src, PullMode::Peek, flags)
    }
}

impl<T> fmt::Debug for Fifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fifo")
            .field("opaque", &self.opaque)
            .field("size", &self.size())
            .field("max_size", &self.max_size())
            .finish_non_exhaustive()
    }
}
