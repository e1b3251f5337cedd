//! Tizona CLI entrypoint.
//!
//! This is the main entrypoint for the tizona command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tizona::aws::{AwsSession, BUCKET_TYPE, CdnApi, CloudFormation, DISTRIBUTION_TYPE};
use tizona::build::{PackageStore, PackageUpload, Repository, parse_revision, run_steps};
use tizona::cli::{
    Cli, Commands, OutputFormatter, ServiceCommands, StackCommands, TemplateArgs, UiCommands,
};
use tizona::config::{
    ConfigParser, ConfigValidator, Identity, TizonaConfig, find_config_file, resolve_identity,
};
use tizona::deploy::{ApiInspector, Artifact, FunctionUpdater, summarize};
use tizona::error::{ConfigError, DeployError, Result};
use tizona::planner::{ChangePlanner, PlanOutcome};
use tizona::release::{ReleaseOrchestrator, ReleaseSettings, default_distribution_base};
use tizona::stack::{ResourceLister, StackRegistry};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Every remote call is awaited in turn; one thread is enough.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Everything a command needs once identity is resolved.
struct Context {
    /// Project file contents (defaults when no file was found).
    config: TizonaConfig,
    /// Directory of the project file, or the working directory.
    root: PathBuf,
    /// Resolved project, profile and region.
    identity: Identity,
    /// AWS configuration for the resolved profile and region.
    session: AwsSession,
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let ctx = load_context(&cli).await?;

    match cli.command {
        Commands::Stack { command } => match command {
            StackCommands::List => cmd_stack_list(&ctx, &formatter).await,
            StackCommands::Resources { service } => {
                cmd_stack_resources(&ctx, &service, &formatter).await
            }
        },
        Commands::Service { command } => match command {
            ServiceCommands::ListFunctions { api } => {
                cmd_list_functions(&ctx, api.as_deref(), &formatter).await
            }
            ServiceCommands::ListApis => cmd_list_apis(&ctx, &formatter).await,
            ServiceCommands::GetApi { service } => cmd_get_api(&ctx, &service, &formatter).await,
            ServiceCommands::Build { service, force } => {
                let upload = build_service(&ctx, &service, force).await?;
                emit(&formatter, &formatter.format_package(&upload))
            }
            ServiceCommands::Plan(template) => cmd_plan(&ctx, &template, &formatter).await,
            ServiceCommands::Apply { template, yes } => {
                cmd_apply(&ctx, &template, yes, &formatter).await
            }
            ServiceCommands::Deploy {
                service,
                lambda_function,
                local,
                commit,
            } => {
                cmd_deploy(
                    &ctx,
                    &service,
                    lambda_function.as_deref(),
                    local,
                    commit.as_deref(),
                    &formatter,
                )
                .await
            }
        },
        Commands::Ui { command } => match command {
            UiCommands::Build => cmd_ui_build(&ctx).await,
            UiCommands::Deploy {
                skip_build,
                release,
            } => cmd_ui_deploy(&ctx, skip_build, release, &formatter).await,
            UiCommands::Release { release } => {
                cmd_ui_release(&ctx, release.as_deref(), &formatter).await
            }
            UiCommands::Current => cmd_ui_current(&ctx, &formatter).await,
            UiCommands::Rollback { release } => cmd_ui_rollback(&ctx, &release, &formatter).await,
            UiCommands::List => cmd_ui_list(&ctx, &formatter).await,
        },
    }
}

/// Writes a formatted result: JSON documents to stdout, text to stderr.
fn emit(formatter: &OutputFormatter, output: &str) -> Result<()> {
    if formatter.is_json() {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{output}")?;
    } else {
        eprintln!("{output}");
    }
    Ok(())
}

/// Finds the project file, or `None` when it is optional and absent.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = config_path {
        return Ok(Some(path.clone()));
    }

    match find_config_file(".") {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.is_configuration() => {
            debug!("No project file found: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Loads the project file and `.env`, resolves identity and AWS settings.
async fn load_context(cli: &Cli) -> Result<Context> {
    let config_file = resolve_config_path(cli.config.as_ref())?;

    let root = match config_file.as_deref().and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };

    let parser = ConfigParser::new().with_base_path(&root);
    parser.load_dotenv()?;

    let config = match &config_file {
        Some(path) => Some(parser.load_file(path)?),
        None => None,
    };

    let validator = ConfigValidator::new();
    if let Some(config) = &config {
        validator.validate(config)?;
    }

    let identity = resolve_identity(&cli.identity_overrides(), config.as_ref(), |key| {
        std::env::var(key).ok()
    })?;
    validator.validate_identity(&identity)?;

    info!(
        "Project {} (profile {}, region {})",
        identity.project, identity.profile, identity.region
    );
    let session = AwsSession::load(&identity.profile, &identity.region).await;

    Ok(Context {
        config: config.unwrap_or_default(),
        root,
        identity,
        session,
    })
}

/// Asks for confirmation on stderr.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N]: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// List the project's stacks.
async fn cmd_stack_list(ctx: &Context, formatter: &OutputFormatter) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let registry = StackRegistry::new(&cfn);

    let stacks = registry.list_stacks(&ctx.identity.project).await?;
    emit(formatter, &formatter.format_stacks(&ctx.identity.project, &stacks))
}

/// List the resources of a service's stack.
async fn cmd_stack_resources(
    ctx: &Context,
    service: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let registry = StackRegistry::new(&cfn);

    let stack = registry.require_stack(&ctx.identity.project, service).await?;
    let resources = ResourceLister::new(&cfn).list_resources(&stack.name).await?;
    emit(formatter, &formatter.format_resources(&stack.name, &resources))
}

/// List the functions behind each REST API.
async fn cmd_list_functions(
    ctx: &Context,
    fragment: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let gateway = ctx.session.apigateway();
    let registry = StackRegistry::new(&cfn);
    let inspector = ApiInspector::new(
        &registry,
        ResourceLister::new(&cfn),
        &gateway,
        ctx.session.region(),
    );

    let apis = inspector
        .list_api_functions(&ctx.identity.project, fragment)
        .await?;
    emit(formatter, &formatter.format_api_functions(&apis))
}

/// Describe every REST API of the project.
async fn cmd_list_apis(ctx: &Context, formatter: &OutputFormatter) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let gateway = ctx.session.apigateway();
    let registry = StackRegistry::new(&cfn);
    let inspector = ApiInspector::new(
        &registry,
        ResourceLister::new(&cfn),
        &gateway,
        ctx.session.region(),
    );

    let apis = inspector.describe_project(&ctx.identity.project).await?;
    emit(formatter, &formatter.format_apis(&apis))
}

/// Describe the REST API of one service.
async fn cmd_get_api(ctx: &Context, service: &str, formatter: &OutputFormatter) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let gateway = ctx.session.apigateway();
    let registry = StackRegistry::new(&cfn);
    let inspector = ApiInspector::new(
        &registry,
        ResourceLister::new(&cfn),
        &gateway,
        ctx.session.region(),
    );

    let api = inspector
        .describe_service(&ctx.identity.project, service)
        .await?;
    emit(formatter, &formatter.format_api(&api))
}

/// Runs a service's build steps and uploads its package for the current
/// revision.
async fn build_service(ctx: &Context, service: &str, force: bool) -> Result<PackageUpload> {
    let settings = ctx.config.service(service)?;
    let package = settings.package.as_ref().ok_or_else(|| {
        ConfigError::validation(
            format!("Service '{service}' has no package to build"),
            format!("services.{service}.package"),
        )
    })?;
    let bucket = ctx.config.artifact_bucket()?;

    let revision = Repository::new(&ctx.root).revision().await?;
    info!("Building {service} at revision {revision}");
    run_steps(&settings.build, &ctx.root).await?;

    let s3 = ctx.session.s3();
    PackageStore::new(&s3, bucket)
        .publish(&ctx.root.join(package), &revision, force)
        .await
}

/// Reads the candidate template and parameters of a service.
fn candidate_template(
    ctx: &Context,
    args: &TemplateArgs,
) -> Result<(String, std::collections::BTreeMap<String, String>)> {
    let settings = ctx.config.services.get(&args.service);
    let path = args
        .template
        .as_ref()
        .or_else(|| settings.and_then(|s| s.template.as_ref()))
        .ok_or_else(|| {
            ConfigError::validation(
                format!("No template for '{}' (use --template)", args.service),
                format!("services.{}.template", args.service),
            )
        })?;

    let path = ctx.root.join(path);
    debug!("Reading candidate template {}", path.display());
    let body = std::fs::read_to_string(&path)?;
    let parameters = settings.map(|s| s.parameters.clone()).unwrap_or_default();
    Ok((body, parameters))
}

/// Compute a change set, show its diff, then delete it.
async fn cmd_plan(ctx: &Context, args: &TemplateArgs, formatter: &OutputFormatter) -> Result<()> {
    let (body, parameters) = candidate_template(ctx, args)?;

    let cfn = ctx.session.cloudformation();
    let registry = StackRegistry::new(&cfn);
    let stack = registry
        .require_stack(&ctx.identity.project, &args.service)
        .await?;
    let planner = change_planner(&cfn, &ctx.config);

    match planner.plan(&stack, &body, &parameters).await? {
        PlanOutcome::NoChanges => emit(formatter, &formatter.format_no_changes(&stack.name)),
        PlanOutcome::Changes { proposal, diff } => {
            let shown = emit(formatter, &formatter.format_plan(&proposal, &diff));
            planner.discard(&proposal).await?;
            shown
        }
    }
}

/// Compute a change set, show its diff, and execute it once confirmed.
async fn cmd_apply(
    ctx: &Context,
    args: &TemplateArgs,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (body, parameters) = candidate_template(ctx, args)?;

    let cfn = ctx.session.cloudformation();
    let registry = StackRegistry::new(&cfn);
    let stack = registry
        .require_stack(&ctx.identity.project, &args.service)
        .await?;
    let planner = change_planner(&cfn, &ctx.config);

    let (mut proposal, diff) = match planner.plan(&stack, &body, &parameters).await? {
        PlanOutcome::NoChanges => {
            return emit(formatter, &formatter.format_no_changes(&stack.name));
        }
        PlanOutcome::Changes { proposal, diff } => (proposal, diff),
    };
    let approved = emit(formatter, &formatter.format_plan(&proposal, &diff)).and_then(|()| {
        if auto_approve {
            Ok(true)
        } else {
            confirm(&format!("Do you want to apply this change set to {}?", stack.name))
        }
    });

    match approved {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("Apply cancelled.");
            return planner.discard(&proposal).await;
        }
        Err(e) => {
            if let Err(cleanup) = planner.discard(&proposal).await {
                warn!("Failed to delete change set {}: {cleanup}", proposal.name);
            }
            return Err(e);
        }
    }

    let status = planner.apply(&mut proposal).await?;
    emit(formatter, &formatter.format_applied(&proposal, &status))
}

fn change_planner<'a>(cfn: &'a CloudFormation, config: &TizonaConfig) -> ChangePlanner<'a> {
    ChangePlanner::new(cfn).with_settings(config.timeouts.planner_settings())
}

/// Update a service's functions to a package.
async fn cmd_deploy(
    ctx: &Context,
    service: &str,
    target: Option<&str>,
    local: bool,
    commit: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let lambda = ctx.session.lambda();
    let registry = StackRegistry::new(&cfn);
    let stack = registry.require_stack(&ctx.identity.project, service).await?;

    let updater = FunctionUpdater::new(ResourceLister::new(&cfn), &lambda);
    let selected = updater.select_functions(&stack, target).await?;

    let artifact: Artifact = match (local, commit) {
        (true, _) => build_service(ctx, service, false).await?.artifact,
        (false, Some(commit)) => {
            let revision = parse_revision(commit)?;
            let s3 = ctx.session.s3();
            PackageStore::new(&s3, ctx.config.artifact_bucket()?)
                .require(&revision)
                .await?
        }
        (false, None) => return Err(DeployError::NoSource.into()),
    };

    let outcomes = updater.update_selected(&stack, selected, &artifact).await;
    emit(formatter, &formatter.format_function_outcomes(&outcomes))?;
    summarize(&outcomes)
}

/// Resolves the website bucket and distribution of the project.
async fn release_settings(ctx: &Context, cfn: &CloudFormation) -> Result<ReleaseSettings> {
    let registry = StackRegistry::new(cfn);
    let resources = ResourceLister::new(cfn);
    let ui = &ctx.config.ui;

    let stack = registry.require_stack(&ctx.identity.project, &ui.stack).await?;
    let bucket = resources.physical_id_of(&stack.name, BUCKET_TYPE).await?;
    let distribution = resources
        .list_of_type(&stack.name, DISTRIBUTION_TYPE)
        .await?
        .into_iter()
        .find_map(|r| r.physical_id);

    let base = ui
        .distribution_base
        .clone()
        .unwrap_or_else(|| default_distribution_base(ctx.session.region(), &bucket));

    let mut settings = ReleaseSettings::new(bucket, base)
        .with_distribution(distribution)
        .with_wait_for_cdn(ui.wait_for_cdn);
    settings.cdn_timeout = ctx.config.timeouts.cdn_timeout();
    Ok(settings)
}

/// Install dependencies and build the front end.
async fn cmd_ui_build(ctx: &Context) -> Result<()> {
    info!("Building front end in {}", ctx.root.display());
    run_steps(&ctx.config.ui.build, &ctx.root).await?;
    eprintln!("Build complete: {}", ctx.root.join(&ctx.config.ui.dist).display());
    Ok(())
}

/// Publish the built assets under the current revision.
async fn cmd_ui_deploy(
    ctx: &Context,
    skip_build: bool,
    release: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    if !skip_build {
        cmd_ui_build(ctx).await?;
    }

    let repository = Repository::new(&ctx.root);
    let untracked = repository.untracked_files().await?;
    if !untracked.is_empty() {
        warn!(
            "{} untracked files are not part of the revision: {}",
            untracked.len(),
            untracked.join(", ")
        );
    }
    let hash = repository.revision().await?;

    let cfn = ctx.session.cloudformation();
    let s3 = ctx.session.s3();
    let cloudfront = ctx.session.cloudfront();
    let orchestrator =
        ReleaseOrchestrator::new(&s3, Some(&cloudfront as &dyn CdnApi), release_settings(ctx, &cfn).await?);

    let dist = ctx.root.join(&ctx.config.ui.dist);
    let uploaded = if release {
        orchestrator.publish_release(&dist, &hash).await?
    } else {
        orchestrator.upload_release(&dist, &hash).await?
    };

    emit(formatter, &formatter.format_uploaded_release(&uploaded))?;
    if release {
        emit(formatter, &formatter.format_released(&uploaded.document))?;
    }
    Ok(())
}

/// Switch the website to a release, the latest one by default.
async fn cmd_ui_release(
    ctx: &Context,
    version: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let s3 = ctx.session.s3();
    let cloudfront = ctx.session.cloudfront();
    let orchestrator =
        ReleaseOrchestrator::new(&s3, Some(&cloudfront as &dyn CdnApi), release_settings(ctx, &cfn).await?);

    let version = match version {
        Some(version) => orchestrator.require_published(version).await?,
        None => orchestrator.latest_release().await?,
    };

    orchestrator.release(&version).await?;
    let current = orchestrator.current_release().await?;
    emit(formatter, &formatter.format_released(&current))
}

/// Show the release currently served.
async fn cmd_ui_current(ctx: &Context, formatter: &OutputFormatter) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let s3 = ctx.session.s3();
    let orchestrator = ReleaseOrchestrator::new(&s3, None, release_settings(ctx, &cfn).await?);

    let current = orchestrator.current_release().await?;
    emit(formatter, &formatter.format_current_release(&current))
}

/// Switch back to a previously published release.
async fn cmd_ui_rollback(ctx: &Context, version: &str, formatter: &OutputFormatter) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let s3 = ctx.session.s3();
    let cloudfront = ctx.session.cloudfront();
    let orchestrator =
        ReleaseOrchestrator::new(&s3, Some(&cloudfront as &dyn CdnApi), release_settings(ctx, &cfn).await?);

    orchestrator.rollback(version).await?;
    let current = orchestrator.current_release().await?;
    emit(formatter, &formatter.format_released(&current))
}

/// List published releases.
async fn cmd_ui_list(ctx: &Context, formatter: &OutputFormatter) -> Result<()> {
    let cfn = ctx.session.cloudformation();
    let s3 = ctx.session.s3();
    let orchestrator = ReleaseOrchestrator::new(&s3, None, release_settings(ctx, &cfn).await?);

    let releases = orchestrator.list_releases().await?;
    let current = match orchestrator.current_release().await {
        Ok(current) => Some(current),
        Err(e) => {
            warn!("{e}");
            None
        }
    };
    emit(
        formatter,
        &formatter.format_releases(&releases, current.as_deref()),
    )
}
