/// The long-running phases of a flash run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Write,
    Verify,
}

/// Receives progress for the write and verify phases.
///
/// `total` is `None` when the size is not known up front, which is the case
/// for the write phase of a compressed image.
pub trait Progress {
    fn start(&mut self, _stage: Stage, _total: Option<u64>) {}
    fn advance(&mut self, _stage: Stage, _done: u64) {}
    fn finish(&mut self, _stage: Stage) {}
    /// Called instead of `finish` when the stage fails.
    fn abandon(&mut self, _stage: Stage) {}
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn start(&mut self, stage: Stage, total: Option<u64>) {
        (**self).start(stage, total)
    }

    fn advance(&mut self, stage: Stage, done: u64) {
        (**self).advance(stage, done)
    }

    fn finish(&mut self, stage: Stage) {
        (**self).finish(stage)
    }

    fn abandon(&mut self, stage: Stage) {
        (**self).abandon(stage)
    }
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}
