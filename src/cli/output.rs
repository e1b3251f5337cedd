//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::aws::{Resource, Stack, StackStatus, StoredObject};
use crate::build::PackageUpload;
use crate::deploy::{ApiDescription, ApiFunctions, FunctionOutcome};
use crate::planner::{ChangeProposal, TemplateDiff};
use crate::release::UploadedRelease;

use super::commands::OutputFormat;

/// Context lines shown around each hunk of a template diff.
const DIFF_CONTEXT: usize = 3;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack row for table display.
#[derive(Tabled)]
struct StackRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Logical ID")]
    logical_id: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Physical ID")]
    physical_id: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Function update row for table display.
#[derive(Tabled)]
struct FunctionRow {
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Version")]
    version: String,
}

/// Release row for table display.
#[derive(Tabled)]
struct ReleaseRow {
    #[tabled(rename = "Release")]
    document: String,
    #[tabled(rename = "Published")]
    published: String,
    #[tabled(rename = "")]
    current: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns true when output is a JSON document for scripting.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Formats the stacks of a project.
    #[must_use]
    pub fn format_stacks(&self, project: &str, stacks: &[Stack]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(stacks).unwrap_or_default(),
            OutputFormat::Text => {
                if stacks.is_empty() {
                    return format!("No stacks found for project {project}.\n");
                }

                let rows: Vec<StackRow> = stacks
                    .iter()
                    .map(|s| StackRow {
                        name: s.name.clone(),
                        status: Self::format_stack_status(&s.status),
                        updated: s
                            .updated_at
                            .or(s.created_at)
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default(),
                    })
                    .collect();

                let mut output = format!("\nStacks of {project}\n\n");
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats the resources of a stack.
    #[must_use]
    pub fn format_resources(&self, stack: &str, resources: &[Resource]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ResourcesJson {
                stack,
                resources,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                let rows: Vec<ResourceRow> = resources
                    .iter()
                    .map(|r| ResourceRow {
                        logical_id: r.logical_id.clone(),
                        resource_type: r.resource_type.clone(),
                        physical_id: Self::truncate(r.physical_id.as_deref().unwrap_or("-"), 48),
                        status: r.status.clone(),
                    })
                    .collect();

                let mut output = format!("\nResources of {stack} ({})\n\n", resources.len());
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats the functions behind each REST API.
    #[must_use]
    pub fn format_api_functions(&self, apis: &[ApiFunctions]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(apis).unwrap_or_default(),
            OutputFormat::Text => {
                if apis.is_empty() {
                    return String::from("No REST APIs found.\n");
                }

                let mut output = String::new();
                for api in apis {
                    let _ = writeln!(output, "{} ({})", api.api.bold(), api.stack);
                    for function in &api.functions {
                        let _ = writeln!(output, "   - {function}");
                    }
                }
                output
            }
        }
    }

    /// Formats REST API descriptions.
    #[must_use]
    pub fn format_apis(&self, apis: &[ApiDescription]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(apis).unwrap_or_default(),
            OutputFormat::Text => apis.iter().map(Self::format_api_text).collect(),
        }
    }

    /// Formats one REST API description.
    #[must_use]
    pub fn format_api(&self, api: &ApiDescription) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(api).unwrap_or_default(),
            OutputFormat::Text => Self::format_api_text(api),
        }
    }

    fn format_api_text(api: &ApiDescription) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "\n{} {}", api.id.bold(), api.url.cyan());

        if !api.authorizers.is_empty() {
            let _ = writeln!(output, "   Authorizers: {}", api.authorizers.join(", "));
        }

        for path in &api.paths {
            let _ = writeln!(output, "   {}", path.path);
            for (method, functions) in &path.methods {
                let target = if functions.is_empty() {
                    "-".dimmed().to_string()
                } else {
                    functions.join(", ")
                };
                let _ = writeln!(output, "      {method:<7} -> {target}");
            }
        }
        output
    }

    /// Formats a template diff before the proposal is applied or discarded.
    #[must_use]
    pub fn format_plan(&self, proposal: &ChangeProposal, diff: &TemplateDiff) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&PlanJson {
                stack: &proposal.stack_name,
                change_set: &proposal.name,
                changed_lines: diff.change_count(),
                diff: diff.unified(DIFF_CONTEXT),
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "\nChange set {} for {}\n\n",
                    proposal.name.bold(),
                    proposal.stack_name
                );

                if diff.is_empty() {
                    let _ = writeln!(
                        output,
                        "{} Template unchanged; only parameters or resources differ.",
                        "⚠".yellow()
                    );
                    return output;
                }

                for line in diff.unified(DIFF_CONTEXT).lines() {
                    let colored = if line.starts_with("+++") || line.starts_with("---") {
                        line.bold().to_string()
                    } else if line.starts_with('+') {
                        line.green().to_string()
                    } else if line.starts_with('-') {
                        line.red().to_string()
                    } else if line.starts_with("@@") {
                        line.cyan().to_string()
                    } else {
                        line.to_string()
                    };
                    output.push_str(&colored);
                    output.push('\n');
                }

                let _ = write!(output, "\n{} lines changed\n", diff.change_count());
                output
            }
        }
    }

    /// Formats the "nothing to deploy" result of a plan.
    #[must_use]
    pub fn format_no_changes(&self, stack: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "stack": stack,
                "status": "no_changes",
            }))
            .unwrap_or_default(),
            OutputFormat::Text => format!(
                "{} No changes to deploy - {stack} is up to date.\n",
                "✓".green()
            ),
        }
    }

    /// Formats the final status of an applied proposal.
    #[must_use]
    pub fn format_applied(&self, proposal: &ChangeProposal, status: &StackStatus) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "stack": proposal.stack_name,
                "change_set": proposal.name,
                "status": status,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => format!(
                "{} {} updated ({})\n",
                "✓".green(),
                proposal.stack_name,
                Self::format_stack_status(status)
            ),
        }
    }

    /// Formats the outcome of a function deployment.
    #[must_use]
    pub fn format_function_outcomes(&self, outcomes: &[FunctionOutcome]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcomes).unwrap_or_default(),
            OutputFormat::Text => {
                let rows: Vec<FunctionRow> = outcomes
                    .iter()
                    .map(|o| FunctionRow {
                        function: o.function_name.clone(),
                        result: match &o.error {
                            None => "updated".green().to_string(),
                            Some(e) => format!("{} {}", "failed".red(), Self::truncate(e, 60)),
                        },
                        version: o
                            .published
                            .as_ref()
                            .map_or_else(String::new, |p| p.version.clone()),
                    })
                    .collect();

                let failed = outcomes.iter().filter(|o| !o.is_success()).count();
                let mut output = String::from("\n");
                output.push_str(&Table::new(rows).to_string());
                let _ = write!(
                    output,
                    "\n\nFunctions: {} updated, {} failed\n",
                    (outcomes.len() - failed).to_string().green(),
                    failed.to_string().red()
                );
                output
            }
        }
    }

    /// Formats the result of a package upload.
    #[must_use]
    pub fn format_package(&self, upload: &PackageUpload) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(upload).unwrap_or_default(),
            OutputFormat::Text => {
                let location = format!("s3://{}/{}", upload.artifact.bucket, upload.artifact.key());
                if upload.uploaded {
                    format!("{} Uploaded package to {location}\n", "✓".green())
                } else {
                    format!(
                        "{} Package already exists at {location} (use --force to replace)\n",
                        "✓".green()
                    )
                }
            }
        }
    }

    /// Formats an uploaded front-end release.
    #[must_use]
    pub fn format_uploaded_release(&self, release: &UploadedRelease) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(release).unwrap_or_default(),
            OutputFormat::Text => format!(
                "{} Published release {} ({} uploaded, {} unchanged)\n",
                "✓".green(),
                release.document.bold(),
                release.uploaded,
                release.unchanged
            ),
        }
    }

    /// Formats the switch to a release.
    #[must_use]
    pub fn format_released(&self, document: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&serde_json::json!({ "current": document }))
                    .unwrap_or_default()
            }
            OutputFormat::Text => format!("{} Now serving {}\n", "✓".green(), document.bold()),
        }
    }

    /// Formats the current release.
    #[must_use]
    pub fn format_current_release(&self, document: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&serde_json::json!({ "current": document }))
                    .unwrap_or_default()
            }
            OutputFormat::Text => format!("Current release: {}\n", document.bold()),
        }
    }

    /// Formats published releases, marking the current one.
    #[must_use]
    pub fn format_releases(&self, releases: &[StoredObject], current: Option<&str>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ReleasesJson {
                current,
                releases,
            })
            .unwrap_or_default(),
            OutputFormat::Text => {
                if releases.is_empty() {
                    return String::from("No releases published.\n");
                }

                let rows: Vec<ReleaseRow> = releases
                    .iter()
                    .map(|r| ReleaseRow {
                        document: r.key.clone(),
                        published: r
                            .last_modified
                            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                            .unwrap_or_default(),
                        current: if current == Some(r.key.as_str()) {
                            "current".green().to_string()
                        } else {
                            String::new()
                        },
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a stack status with color.
    fn format_stack_status(status: &StackStatus) -> String {
        if status.is_in_progress() {
            status.as_str().yellow().to_string()
        } else if status.is_successful() {
            status.as_str().green().to_string()
        } else {
            status.as_str().red().to_string()
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct ResourcesJson<'a> {
    stack: &'a str,
    resources: &'a [Resource],
}

#[derive(serde::Serialize)]
struct PlanJson<'a> {
    stack: &'a str,
    change_set: &'a str,
    changed_lines: usize,
    diff: String,
}

#[derive(serde::Serialize)]
struct ReleasesJson<'a> {
    current: Option<&'a str>,
    releases: &'a [StoredObject],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::PublishedVersion;
    use crate::deploy::Artifact;

    fn text() -> OutputFormatter {
        OutputFormatter::new(OutputFormat::Text)
    }

    fn json() -> OutputFormatter {
        OutputFormatter::new(OutputFormat::Json)
    }

    #[test]
    fn test_stacks_json() {
        let stacks = vec![Stack::named("acme-api", "UPDATE_COMPLETE")];
        let value: serde_json::Value =
            serde_json::from_str(&json().format_stacks("acme", &stacks)).expect("json");

        assert_eq!(value[0]["name"], "acme-api");
        assert_eq!(value[0]["status"], "UPDATE_COMPLETE");
    }

    #[test]
    fn test_empty_stacks_text() {
        let output = text().format_stacks("acme", &[]);
        assert!(output.contains("No stacks found for project acme"));
    }

    #[test]
    fn test_plan_json_carries_diff() {
        let proposal = ChangeProposal::new("acme-api");
        let diff = TemplateDiff::compute(
            r#"{"Resources": {"A": {"Type": "AWS::SNS::Topic"}}}"#,
            r#"{"Resources": {"B": {"Type": "AWS::SNS::Topic"}}}"#,
        )
        .expect("diff");

        let value: serde_json::Value =
            serde_json::from_str(&json().format_plan(&proposal, &diff)).expect("json");

        assert_eq!(value["stack"], "acme-api");
        assert_eq!(value["changed_lines"], 2);
        assert!(value["diff"].as_str().is_some_and(|d| d.contains("+    \"B\"")));
    }

    #[test]
    fn test_function_outcomes_text() {
        let outcomes = vec![
            FunctionOutcome {
                logical_id: String::from("GetUser"),
                function_name: String::from("acme-api-GetUser"),
                published: Some(PublishedVersion {
                    function_name: String::from("acme-api-GetUser"),
                    version: String::from("7"),
                    handler: None,
                    code_sha256: None,
                    last_modified: None,
                }),
                error: None,
            },
            FunctionOutcome {
                logical_id: String::from("PutUser"),
                function_name: String::from("acme-api-PutUser"),
                published: None,
                error: Some(String::from("ResourceConflictException")),
            },
        ];

        let output = text().format_function_outcomes(&outcomes);
        assert!(output.contains("acme-api-GetUser"));
        assert!(output.contains("ResourceConflictException"));
        assert!(output.contains("Functions:"));
    }

    #[test]
    fn test_existing_package_mentions_force() {
        let upload = PackageUpload {
            artifact: Artifact::new("acme-artifacts", "3f786850e387550fdab836ed7e6dc881de23001b"),
            uploaded: false,
        };
        let output = text().format_package(&upload);
        assert!(output.contains("s3://acme-artifacts/3f786850e387550fdab836ed7e6dc881de23001b"));
        assert!(output.contains("--force"));
    }

    #[test]
    fn test_releases_json_marks_current() {
        let releases = vec![StoredObject {
            key: String::from("abc123.html"),
            size: 512,
            last_modified: None,
        }];
        let value: serde_json::Value =
            serde_json::from_str(&json().format_releases(&releases, Some("abc123.html")))
                .expect("json");

        assert_eq!(value["current"], "abc123.html");
        assert_eq!(value["releases"][0]["key"], "abc123.html");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a-very-long-name", 8), "a-ver...");
    }
}
