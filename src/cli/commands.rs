//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::IdentityOverrides;

/// Tizona - DevOps CLI for serverless applications.
#[derive(Parser, Debug)]
#[command(name = "tizona")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the project file (defaults to the nearest `.tizona.yaml`).
    #[arg(short, long, global = true, env = "TIZONA_CONFIG")]
    pub config: Option<PathBuf>,

    /// AWS profile.
    #[arg(short = 'p', long, global = true, env = "AWS_PROFILE")]
    pub aws_profile: Option<String>,

    /// AWS region.
    #[arg(short = 'r', long, global = true, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// Project name; stacks belong to it when their name contains it.
    #[arg(long, global = true, env = "TIZONA_PROJECT")]
    pub project: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Identity values given on the command line or by clap's env fallback.
    #[must_use]
    pub fn identity_overrides(&self) -> IdentityOverrides {
        IdentityOverrides {
            project: self.project.clone(),
            profile: self.aws_profile.clone(),
            region: self.aws_region.clone(),
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the project's stacks.
    Stack {
        /// Stack subcommand.
        #[command(subcommand)]
        command: StackCommands,
    },

    /// Build, plan and deploy backend services.
    Service {
        /// Service subcommand.
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// Build, publish and release the static front end.
    Ui {
        /// UI subcommand.
        #[command(subcommand)]
        command: UiCommands,
    },
}

/// Stack subcommands.
#[derive(Subcommand, Debug)]
pub enum StackCommands {
    /// List the stacks of the project.
    List,

    /// List the resources of a service's stack.
    Resources {
        /// Service name fragment.
        service: String,
    },
}

/// Template selection shared by `plan` and `apply`.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Service name fragment.
    pub service: String,

    /// Candidate template (defaults to the service's `template`).
    #[arg(short, long)]
    pub template: Option<PathBuf>,
}

/// Service subcommands.
#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// List the functions behind each REST API.
    ListFunctions {
        /// Only stacks whose name contains this fragment.
        #[arg(long)]
        api: Option<String>,
    },

    /// Describe every REST API of the project.
    ListApis,

    /// Describe the REST API of a service.
    GetApi {
        /// Service name fragment.
        service: String,
    },

    /// Build the service package and upload it keyed by revision.
    Build {
        /// Service name.
        service: String,

        /// Replace an existing package for the same revision.
        #[arg(short, long)]
        force: bool,
    },

    /// Compute a change set and show the template diff.
    Plan(TemplateArgs),

    /// Compute a change set, show the diff, and execute it.
    Apply {
        /// Template selection.
        #[command(flatten)]
        template: TemplateArgs,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Update the service's functions to a package.
    Deploy {
        /// Service name.
        service: String,

        /// Only update this function (logical or physical id).
        #[arg(long)]
        lambda_function: Option<String>,

        /// Build and deploy the current revision.
        #[arg(long, conflicts_with = "commit")]
        local: bool,

        /// Deploy an already packaged revision.
        #[arg(long)]
        commit: Option<String>,
    },
}

/// UI subcommands.
#[derive(Subcommand, Debug)]
pub enum UiCommands {
    /// Install dependencies and build the assets.
    Build,

    /// Publish the built assets under the current revision.
    Deploy {
        /// Publish the existing build output.
        #[arg(long)]
        skip_build: bool,

        /// Switch to the release once published.
        #[arg(long)]
        release: bool,
    },

    /// Switch the website to a release (defaults to the latest).
    Release {
        /// Release hash or document.
        #[arg(value_name = "VERSION")]
        release: Option<String>,
    },

    /// Show the current release.
    Current,

    /// Switch back to a previously published release.
    Rollback {
        /// Release hash or document.
        #[arg(value_name = "VERSION")]
        release: String,
    },

    /// List published releases, oldest first.
    List,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "tizona",
            "--project",
            "acme",
            "-r",
            "eu-west-1",
            "service",
            "deploy",
            "api",
            "--lambda-function",
            "GetUser",
            "--commit",
            "3f786850e387550fdab836ed7e6dc881de23001b",
        ])
        .expect("parse");

        assert_eq!(cli.project.as_deref(), Some("acme"));
        assert_eq!(cli.identity_overrides().region.as_deref(), Some("eu-west-1"));
        match cli.command {
            Commands::Service {
                command:
                    ServiceCommands::Deploy {
                        service,
                        lambda_function,
                        local,
                        commit,
                    },
            } => {
                assert_eq!(service, "api");
                assert_eq!(lambda_function.as_deref(), Some("GetUser"));
                assert!(!local);
                assert!(commit.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_local_and_commit_conflict() {
        let result = Cli::try_parse_from([
            "tizona", "service", "deploy", "api", "--local", "--commit", "abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_release_and_rollback() {
        let cli = Cli::try_parse_from(["tizona", "ui", "release", "abc123"]).expect("parse");
        match cli.command {
            Commands::Ui {
                command: UiCommands::Release { release },
            } => assert_eq!(release.as_deref(), Some("abc123")),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["tizona", "ui", "release"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Ui {
                command: UiCommands::Release { release: None }
            }
        ));

        let cli =
            Cli::try_parse_from(["tizona", "ui", "rollback", "abc123.html"]).expect("parse");
        match cli.command {
            Commands::Ui {
                command: UiCommands::Rollback { release },
            } => assert_eq!(release, "abc123.html"),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["tizona", "ui", "rollback"]).is_err());
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "tizona", "--output", "json", "service", "apply", "api", "-t", "infra/api.yaml", "-y",
        ])
        .expect("parse");

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Service {
                command: ServiceCommands::Apply { yes: true, .. }
            }
        ));
    }
}
