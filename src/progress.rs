// src/progress.rs

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Chunk-level progress for a folder upload. One tick per completed chunk,
/// whatever the fate of the files inside it.
pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    /// Visible progress bar for CLI runs.
    pub fn new(total_chunks: u64) -> Self {
        let bar = ProgressBar::new(total_chunks);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "Uploading: {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
                )
                .unwrap()
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        Self { bar }
    }

    /// Progress that renders nowhere; used by library callers and tests
    /// that only want the counter.
    pub fn hidden(total_chunks: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total_chunks), ProgressDrawTarget::hidden());
        Self { bar }
    }

    /// Set the chunk total once the scan has discovered it.
    pub fn set_total(&self, total_chunks: u64) {
        self.bar.set_length(total_chunks);
    }

    pub fn chunk_completed(&self) {
        self.bar.inc(1);
    }

    pub fn chunks_done(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, uploaded: usize, failed: usize) {
        if failed == 0 {
            self.bar.finish_with_message(format!("{uploaded} files uploaded"));
        } else {
            self.bar
                .finish_with_message(format!("{uploaded} files uploaded, {failed} FAILED"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_tracks_completed_chunks() {
        let progress = UploadProgress::hidden(3);
        assert_eq!(progress.chunks_done(), 0);
        progress.chunk_completed();
        progress.chunk_completed();
        assert_eq!(progress.chunks_done(), 2);
        progress.chunk_completed();
        progress.finish(250, 0);
        assert_eq!(progress.chunks_done(), 3);
    }
}
