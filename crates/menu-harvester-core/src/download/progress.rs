use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Instant;

/// Progress bar for a bulk download
pub struct DownloadProgress {
    bar: ProgressBar,
    start_time: Instant,
}

impl DownloadProgress {
    /// Create a tracker for `total` images; hidden bars draw nothing
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = ProgressBar::new(total as u64);
        if visible {
            let style = ProgressStyle::default_bar()
                .template("{wide_bar} {pos}/{len} ({percent}%) | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ ");
            bar.set_style(style);
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        Self {
            bar,
            start_time: Instant::now(),
        }
    }

    /// Show which file is being fetched
    pub fn start_item(&self, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    pub fn finish_item(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self, saved: usize, total: usize) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        self.bar.finish_with_message(format!(
            "{} of {} saved | {:.1}s elapsed",
            saved, total, elapsed
        ));
    }
}
