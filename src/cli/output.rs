//! Colored output helpers for the CLI

use crate::quality::swot::Section;
use crate::workflows::{FinalReport, Readiness, WorkflowState, WorkflowStatus};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n",
                "STRATA".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            println!("\n   STRATA {}\n", version);
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print the outcome of a finished workflow
    pub fn workflow(&self, state: &WorkflowState) {
        match (state.status(), &state.report) {
            (WorkflowStatus::Completed, Some(report)) => self.report(report),
            (WorkflowStatus::Aborted, _) => self.warning("Workflow aborted"),
            _ => self.error(&format!(
                "Workflow failed at {}: {}",
                state.current_step(),
                state.error.as_deref().unwrap_or("unknown error")
            )),
        }
    }

    pub fn report(&self, report: &FinalReport) {
        let title = match &report.ticker {
            Some(ticker) => format!("{} ({})", report.company, ticker),
            None => report.company.clone(),
        };
        self.header(&format!("SWOT: {}", title));
        self.kv("Strategy focus", &report.strategy_focus);
        self.kv("Score", &report.score.to_string());
        self.kv("Revisions", &report.revision_count.to_string());
        self.kv(
            "Confidence",
            &format!(
                "{}% ({})",
                report.confidence.confidence,
                readiness_label(report.confidence.readiness)
            ),
        );
        if let Some(provider) = &report.provider_used {
            self.kv("Provider", provider);
        }
        if report.cached {
            self.kv("Source", "cache");
        }

        for section in Section::ALL {
            self.subheader(section_title(section));
            let items = report.swot.items(section);
            if items.is_empty() {
                self.list_item("(none)");
            }
            for item in items {
                self.list_item(item);
            }
        }

        if !report.sources_failed.is_empty() {
            let names: Vec<&str> = report.sources_failed.iter().map(|s| s.as_str()).collect();
            self.warning(&format!("Unavailable sources: {}", names.join(", ")));
        }
        if report.meets_quality_bar {
            self.success("Report meets the quality bar");
        } else {
            self.warning("Revision budget exhausted below the quality bar");
        }
    }
}

fn section_title(section: Section) -> &'static str {
    match section {
        Section::Strengths => "Strengths",
        Section::Weaknesses => "Weaknesses",
        Section::Opportunities => "Opportunities",
        Section::Threats => "Threats",
    }
}

fn readiness_label(readiness: Readiness) -> &'static str {
    match readiness {
        Readiness::BoardReady => "Board-ready",
        Readiness::ReviewRecommended => "Review recommended",
        Readiness::Exploratory => "Exploratory",
    }
}
