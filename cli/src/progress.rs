//! Renders [`ubflash_core::Progress`] updates as a 70-column terminal bar,
//! rewritten in place.

use indicatif::{ProgressBar, ProgressStyle};
use ubflash_core::Progress;

pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{msg:>10} [{bar:70}] {percent:>3}%")
                .expect("static progress bar template is well-formed")
                .progress_chars("=> "),
        );
        bar.set_message(label.to_string());
        Self { bar }
    }
}

impl Progress for TerminalProgress {
    fn on_progress(&mut self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
