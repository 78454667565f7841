use indicatif::{ProgressBar, ProgressStyle};

/// Create an animated spinner with the given message for indeterminate
/// progress.
///
/// The spinner ticks automatically and should be finished with
/// [`ProgressBar::finish_with_message`] or [`ProgressBar::finish_and_clear`].
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Create a byte-counting progress bar for a transfer of `len` bytes.
pub fn transfer_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
            .expect("valid template")
            .progress_chars("##-"),
    );
    pb.set_message(message.to_string());
    pb
}
