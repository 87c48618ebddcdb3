//! Output formatting for resolved classpaths and check reports
//!
//! JSON and YAML are plain serde renderings; the human format is a small tree
//! view meant for terminals.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::classpath::CheckReport;
use crate::model::{ClasspathEntry, ResolvedClasspath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

#[derive(Serialize)]
struct ClasspathDocument<'a> {
    module: &'a str,
    #[serde(flatten)]
    classpath: &'a ResolvedClasspath,
}

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_classpath(&self, module: &str, classpath: &ResolvedClasspath) -> Result<String> {
        let document = ClasspathDocument { module, classpath };
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&document)
                .context("Failed to serialize classpath to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&document).context("Failed to serialize classpath to YAML")
            }
            OutputFormat::Human => Ok(self.classpath_human(module, classpath)),
        }
    }

    pub fn format_check(&self, report: &CheckReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize check report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize check report to YAML")
            }
            OutputFormat::Human => Ok(self.check_human(report)),
        }
    }

    fn classpath_human(&self, module: &str, classpath: &ResolvedClasspath) -> String {
        let mut output = String::new();
        output.push_str(&format!("Classpath of {}\n", module));
        output.push_str(RULE);
        output.push_str("\n\n");

        if classpath.is_empty() {
            output.push_str("(no entries)\n");
            return output;
        }

        push_tree(&mut output, classpath.entries());
        output.push('\n');

        output.push_str(&format!(
            "{} entries, resolved at {}\n",
            classpath.len(),
            classpath.resolved_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output
    }

    fn check_human(&self, report: &CheckReport) -> String {
        let mut output = String::new();
        if report.valid {
            output.push_str(&format!("\u{2713} {} builds cleanly\n", report.module));
            return output;
        }

        output.push_str(&format!("\u{2717} {} is not valid\n", report.module));
        if let Some(ref error) = report.error {
            output.push_str(&format!("  {}\n", error));
        }
        for problem in &report.problems {
            match problem.line {
                Some(line) => output.push_str(&format!(
                    "  - {}:{}: {}\n",
                    problem.resource, line, problem.description
                )),
                None => output.push_str(&format!(
                    "  - {}: {}\n",
                    problem.resource, problem.description
                )),
            }
        }
        output
    }
}

/// Entries in classpath order, tagged by kind
fn push_tree(output: &mut String, entries: &[ClasspathEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        let connector = if i == entries.len() - 1 {
            "\u{2514}\u{2500}"
        } else {
            "\u{251C}\u{2500}"
        };
        match entry {
            ClasspathEntry::Module { path } => {
                output.push_str(&format!("{} module  {}\n", connector, path));
            }
            ClasspathEntry::Library { archive, sources } => {
                output.push_str(&format!("{} library {}", connector, archive.display()));
                if let Some(sources) = sources {
                    output.push_str(&format!(" (sources: {})", sources.display()));
                }
                output.push('\n');
            }
        }
    }
}
