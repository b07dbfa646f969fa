//! Terminal progress display.

use indicatif::{ProgressBar, ProgressStyle};

/// Step-based progress bar for pipeline layers.
pub struct Bar {
    bar: ProgressBar,
}

impl Bar {
    pub fn new(total_steps: u64, description: &str) -> Self {
        let bar = ProgressBar::new(total_steps);
        let style = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] layer {pos}/{len}")
            .expect("valid template")
            .progress_chars("●○ ");

        bar.set_style(style);
        bar.set_message(description.to_string());

        Self { bar }
    }

    pub fn set_step(&self, step: u64) {
        self.bar.set_position(step);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Bar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish();
        }
    }
}
