use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use docstyle_check::report::{render_html, render_json, render_pdf, render_text};
use docstyle_check::{
    BatchError, BatchEvent, BatchSummary, CancelToken, EventSink, RuleConfig, Settings, run_batch,
};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Html,
    Pdf,
}

#[derive(Parser)]
#[command(
    name = "docstyle-check",
    about = "Check DOCX and PDF files against a house formatting style"
)]
struct Args {
    /// Files to check (.docx or .pdf)
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Settings file with rule values (TOML key/value pairs)
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Font family name (e.g. "Times New Roman")
    #[arg(long)]
    font_name: Option<String>,
    /// Font size in points
    #[arg(long)]
    font_size: Option<f64>,
    /// Line spacing multiple (e.g. 1.5)
    #[arg(long)]
    line_spacing: Option<f64>,
    /// Left margin in cm
    #[arg(long)]
    margin_left: Option<f64>,
    /// Right margin in cm
    #[arg(long)]
    margin_right: Option<f64>,
    /// Top margin in cm
    #[arg(long)]
    margin_top: Option<f64>,
    /// Bottom margin in cm
    #[arg(long)]
    margin_bottom: Option<f64>,
    /// Allowed margin deviation in cm
    #[arg(long)]
    margin_tolerance: Option<f64>,
    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Write the report here instead of stdout (required for PDF)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(name) = &self.font_name {
            settings.set("font_name", name.as_str());
        }
        let numeric = [
            ("font_size", self.font_size),
            ("line_spacing", self.line_spacing),
            ("margin_left", self.margin_left),
            ("margin_right", self.margin_right),
            ("margin_top", self.margin_top),
            ("margin_bottom", self.margin_bottom),
            ("margin_tolerance", self.margin_tolerance),
        ];
        for (key, value) in numeric {
            if let Some(v) = value {
                settings.set(key, v);
            }
        }
    }
}

struct ProgressSink {
    bar: ProgressBar,
}

impl ProgressSink {
    fn new(total: usize, quiet: bool) -> Self {
        let bar = if quiet || !std::io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("█▓░"));
            }
            bar
        };
        ProgressSink { bar }
    }
}

impl EventSink for ProgressSink {
    fn emit(&self, event: BatchEvent) -> Result<(), BatchError> {
        match event {
            BatchEvent::Progress { current, path, .. } => {
                self.bar.set_position(current as u64);
                if let Some(name) = path.file_name() {
                    self.bar.set_message(name.to_string_lossy().into_owned());
                }
            }
            BatchEvent::Started { path, .. } => {
                if let Some(name) = path.file_name() {
                    self.bar.set_message(name.to_string_lossy().into_owned());
                }
            }
            BatchEvent::FileCompleted(_) => {}
            BatchEvent::Completed { .. } => self.bar.finish_and_clear(),
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error: cannot load settings {}: {e}", path.display());
                return ExitCode::from(2);
            }
        },
        None => Settings::new(),
    };

    let level = if args.verbose || settings.extensive_logging() {
        "debug"
    } else {
        "warn"
    };
    // lopdf logs every string it decodes at info level.
    let filter = format!("{level},lopdf=warn");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if matches!(args.format, Format::Pdf) && args.output.is_none() {
        eprintln!("Error: --format pdf requires --output");
        return ExitCode::from(2);
    }

    args.apply_overrides(&mut settings);
    let config = RuleConfig::from_settings(&settings);

    let sink = ProgressSink::new(args.files.len(), args.quiet);
    let outcome = match run_batch(&args.files, &config, &CancelToken::new(), &sink) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let summary = BatchSummary::from_results(outcome.results.iter().map(|f| &f.result));
    let bytes = match args.format {
        Format::Text => render_text(&outcome.results, &summary, &config).into_bytes(),
        Format::Html => render_html(&outcome.results, &summary, &config).into_bytes(),
        Format::Pdf => render_pdf(&outcome.results, &summary, &config),
        Format::Json => match render_json(&outcome.results, &summary, &config) {
            Ok(json) => json.into_bytes(),
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(2);
            }
        },
    };

    let written = match &args.output {
        Some(path) => std::fs::write(path, &bytes),
        None => std::io::stdout().write_all(&bytes),
    };
    if let Err(e) = written {
        eprintln!("Error: cannot write report: {e}");
        return ExitCode::from(2);
    }

    if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Args;

    #[test]
    fn every_option_has_help_text() {
        let command = Args::command();
        command.clone().debug_assert();
        for arg in command.get_arguments() {
            assert!(arg.get_help().is_some(), "--{} has no help", arg.get_id());
        }
    }
}
