use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 80;

/// Row progress for streaming table commands.
///
/// Shows a bar when the table declares its row count and a spinner otherwise.
pub struct RowProgress {
    pb: ProgressBar,
}

impl RowProgress {
    pub fn new(row_count: Option<usize>, message: &str, hidden: bool) -> Self {
        let pb = match row_count {
            Some(total) => ProgressBar::new(total as u64).with_style(Self::bar_style()),
            None => {
                let pb = ProgressBar::new_spinner().with_style(Self::spinner_style());
                if !hidden {
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                pb
            }
        };
        pb.set_draw_target(if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        });
        pb.set_message(message.to_string());
        Self { pb }
    }

    pub fn set_position(&self, rows: usize) {
        self.pb.set_position(rows as u64);
    }

    pub fn finish(&self, rows: usize) {
        self.pb.disable_steady_tick();
        self.pb.set_position(rows as u64);
        self.pb.finish_with_message(format!("✓ {} rows", rows));
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} {pos} rows")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}
