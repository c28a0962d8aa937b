//! The progress-reporting seam between [`crate::session::Session`] and
//! whatever front end is driving it.
//!
//! The core crate stays presentation-free: it reports percentages through
//! this trait, and the CLI supplies the actual terminal bar (see
//! `ubflash-cli`'s `indicatif`-backed implementation). Tests and other
//! library consumers can use [`NullProgress`].

/// Receives percent-complete updates (0..=100) for a long-running session step.
pub trait Progress {
    fn on_progress(&mut self, percent: u8);
    fn finish(&mut self) {}
}

/// A progress sink that discards every update.
#[derive(Debug, Default)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn on_progress(&mut self, _percent: u8) {}
}
