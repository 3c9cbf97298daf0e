use indicatif::{ProgressBar, ProgressStyle};

/// Bar for a pass over `len` items. Hidden when `quiet` is set.
pub fn bar(len: u64, quiet: bool, unit: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let template = format!("[{{elapsed_precise}}] {{bar:40}} {{pos}}/{{len}} {}", unit);
    let style = ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb
}

/// Spinner for passes of unknown length, such as streaming a dump.
pub fn spinner(quiet: bool, unit: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let template = format!("[{{elapsed_precise}}] {{spinner}} {{pos}} {}", unit);
    let style = ProgressStyle::default_spinner()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb
}
