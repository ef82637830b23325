// everest-control-cli/src/main.rs
// ============================================================================
// Module: Everest Control CLI Entry Point
// Description: Command dispatcher for namespace provisioning and RBAC checks.
// Purpose: Wire config, cluster backends, and core runtime into one binary.
// Dependencies: clap, everest-control-core, everest-control-config,
//               everest-control-cluster, tokio
// ============================================================================

//! ## Overview
//! The `everest-control` binary provisions database namespaces through helm
//! and answers RBAC questions against the configured policy. Every command
//! loads `everest-control.toml` first and fails closed on invalid config.
//! Ctrl-C cancels in-flight provisioning; the step in progress is abandoned
//! and no further namespaces are touched.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use everest_control_cluster::HelmReleaseInstaller;
use everest_control_cluster::KubeClusterClient;
use everest_control_cluster::read_ca_file;
use everest_control_cluster::read_token_file;
use everest_control_config::AuditConfig;
use everest_control_config::AuditSinkKind;
use everest_control_config::EverestControlConfig;
use everest_control_config::RbacConfig;
use everest_control_core::AccessRequest;
use everest_control_core::Action;
use everest_control_core::AppliedAction;
use everest_control_core::AuditSink;
use everest_control_core::Authorizer;
use everest_control_core::ChartRef;
use everest_control_core::FileAuditSink;
use everest_control_core::InMemoryPolicyStore;
use everest_control_core::NamespaceProvisioner;
use everest_control_core::NamespaceStateResolver;
use everest_control_core::NoopAuditSink;
use everest_control_core::NoopProgress;
use everest_control_core::ObjectId;
use everest_control_core::OperatorSelection;
use everest_control_core::PermitAllAuthorizer;
use everest_control_core::PolicyAuthorizer;
use everest_control_core::ProgressReporter;
use everest_control_core::ProvisionReport;
use everest_control_core::ProvisionRequest;
use everest_control_core::ResourceType;
use everest_control_core::StderrAuditSink;
use everest_control_core::SubjectId;
use everest_control_core::TextProgress;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "everest-control", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Config file path (defaults to everest-control.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Database namespace provisioning.
    Namespaces {
        /// Selected namespaces subcommand.
        #[command(subcommand)]
        command: NamespacesCommand,
    },
    /// RBAC policy utilities.
    Rbac {
        /// Selected RBAC subcommand.
        #[command(subcommand)]
        command: RbacCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Namespaces subcommands.
#[derive(Subcommand, Debug)]
enum NamespacesCommand {
    /// Install the database namespace release into new namespaces.
    Add(NamespacesAddCommand),
    /// Upgrade the database namespace release in managed namespaces.
    Update(NamespacesUpdateCommand),
}

/// Arguments for `namespaces add`.
#[derive(Args, Debug)]
struct NamespacesAddCommand {
    /// Install into namespaces that already exist but are not managed yet.
    #[arg(long, action = ArgAction::SetTrue)]
    take_ownership: bool,
    /// Shared provisioning arguments.
    #[command(flatten)]
    common: ProvisionArgs,
}

/// Arguments for `namespaces update`.
#[derive(Args, Debug)]
struct NamespacesUpdateCommand {
    /// Shared provisioning arguments.
    #[command(flatten)]
    common: ProvisionArgs,
}

/// Arguments shared by `namespaces add` and `namespaces update`.
#[derive(Args, Debug)]
struct ProvisionArgs {
    /// Comma-separated namespace list.
    #[arg(long, value_name = "LIST")]
    namespaces: String,
    /// Install the MongoDB operator.
    #[arg(long = "operator-mongodb", default_value_t = true, action = ArgAction::Set)]
    operator_mongodb: bool,
    /// Install the PostgreSQL operator.
    #[arg(long = "operator-postgresql", default_value_t = true, action = ArgAction::Set)]
    operator_postgresql: bool,
    /// Install the XtraDB Cluster operator.
    #[arg(long = "operator-xtradb-cluster", default_value_t = true, action = ArgAction::Set)]
    operator_xtradb_cluster: bool,
    /// Disable telemetry in the installed release.
    #[arg(long, action = ArgAction::SetTrue)]
    disable_telemetry: bool,
    /// Print progress with status symbols.
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
    /// Print the provisioning report as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Local checkout of the main chart (overrides the repository).
    #[arg(long, value_name = "DIR")]
    chart_dir: Option<PathBuf>,
    /// Chart repository URL.
    #[arg(long, value_name = "URL")]
    repo_url: Option<String>,
    /// Chart version.
    #[arg(long = "version", value_name = "VERSION")]
    chart_version: Option<String>,
    /// Kubeconfig passed to helm.
    #[arg(long, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,
}

/// RBAC subcommands.
#[derive(Subcommand, Debug)]
enum RbacCommand {
    /// Check whether a subject may perform an action on an object.
    Can(RbacCanCommand),
    /// Validate the RBAC section of the config.
    Validate,
}

/// Arguments for `rbac can`.
#[derive(Args, Debug)]
struct RbacCanCommand {
    /// Subject identifier.
    #[arg(long, value_name = "SUBJECT")]
    subject: String,
    /// Resource type, e.g. `database-clusters`.
    #[arg(long, value_name = "RESOURCE")]
    resource: String,
    /// Action: read, create, update, or delete.
    #[arg(long, value_name = "ACTION")]
    action: String,
    /// Object identifier `namespace/name`.
    #[arg(long, value_name = "OBJECT")]
    object: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an Everest control configuration file.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = EverestControlConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    match cli.command {
        Commands::Namespaces {
            command,
        } => command_namespaces(&config, command).await,
        Commands::Rbac {
            command,
        } => match command {
            RbacCommand::Can(command) => command_rbac_can(&config.rbac, &command),
            RbacCommand::Validate => command_rbac_validate(&config.rbac),
        },
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(),
    }
}

// ============================================================================
// SECTION: Namespace Commands
// ============================================================================

/// Executes `namespaces add` or `namespaces update`.
async fn command_namespaces(
    config: &EverestControlConfig,
    command: NamespacesCommand,
) -> CliResult<ExitCode> {
    let (request, args) = match command {
        NamespacesCommand::Add(command) => {
            let request = ProvisionRequest::install(
                command.common.namespaces.clone(),
                command.take_ownership,
                operator_selection(&command.common),
            );
            (request, command.common)
        }
        NamespacesCommand::Update(command) => {
            let request = ProvisionRequest::update(
                command.common.namespaces.clone(),
                operator_selection(&command.common),
            );
            (request, command.common)
        }
    };
    let request = request.with_telemetry_disabled(args.disable_telemetry);
    let provisioner = build_provisioner(config, &args)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let progress = progress_reporter(&args, std::io::stdout());
    let report = provisioner
        .provision(&request, progress.as_ref(), &cancel)
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
        write_stdout_line(&rendered)?;
    } else {
        for line in report_lines(&report) {
            write_stdout_line(&line)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Selects the step reporter; a JSON report owns stdout exclusively.
fn progress_reporter<W>(args: &ProvisionArgs, out: W) -> Box<dyn ProgressReporter>
where
    W: Write + Send + 'static,
{
    if args.json {
        Box::new(NoopProgress)
    } else {
        Box::new(TextProgress::new(out, args.pretty))
    }
}

/// Builds the operator selection from flags.
const fn operator_selection(args: &ProvisionArgs) -> OperatorSelection {
    OperatorSelection {
        pxc: args.operator_xtradb_cluster,
        psmdb: args.operator_mongodb,
        pg: args.operator_postgresql,
    }
}

/// Applies command-line chart overrides on top of the configured chart.
fn chart_ref(config: &EverestControlConfig, args: &ProvisionArgs) -> ChartRef {
    let mut chart = config.installer.chart_ref();
    if let Some(dir) = &args.chart_dir {
        chart.directory = Some(dir.clone());
    }
    if let Some(repo_url) = &args.repo_url {
        chart.repo_url = Some(repo_url.clone());
    }
    if let Some(version) = &args.chart_version {
        chart.version = Some(version.clone());
    }
    chart
}

/// Wires the provisioner from config and flags.
fn build_provisioner(
    config: &EverestControlConfig,
    args: &ProvisionArgs,
) -> CliResult<NamespaceProvisioner> {
    let token = config
        .cluster
        .token_file
        .as_deref()
        .map(|path| read_token_file(path.as_ref()))
        .transpose()
        .map_err(|err| CliError::new(err.to_string()))?;
    let ca_pem = config
        .cluster
        .ca_file
        .as_deref()
        .map(|path| read_ca_file(path.as_ref()))
        .transpose()
        .map_err(|err| CliError::new(err.to_string()))?;
    let client = match ca_pem {
        Some(ca_pem) => KubeClusterClient::with_ca_pem(
            &config.cluster.api_url,
            token,
            &ca_pem,
            config.cluster.connect_timeout(),
            config.cluster.request_timeout(),
        ),
        None => KubeClusterClient::new(
            &config.cluster.api_url,
            token,
            config.cluster.connect_timeout(),
            config.cluster.request_timeout(),
        ),
    }
    .map_err(|err| CliError::new(err.to_string()))?;

    let mut installer = HelmReleaseInstaller::new(&config.installer.helm_binary);
    let kubeconfig =
        args.kubeconfig.clone().or_else(|| config.installer.kubeconfig.as_ref().map(PathBuf::from));
    if let Some(kubeconfig) = kubeconfig {
        installer = installer.with_kubeconfig(kubeconfig);
    }

    Ok(NamespaceProvisioner::new(
        NamespaceStateResolver::new(Arc::new(client)),
        Arc::new(installer),
        chart_ref(config, args),
        build_audit_sink(&config.audit)?,
    ))
}

/// Renders one summary line per provisioned namespace.
fn report_lines(report: &ProvisionReport) -> Vec<String> {
    report
        .outcomes
        .iter()
        .map(|outcome| {
            let action = match outcome.action {
                AppliedAction::Installed {
                    created_namespace: true,
                } => "installed (namespace created)",
                AppliedAction::Installed {
                    created_namespace: false,
                } => "installed (ownership taken)",
                AppliedAction::Updated => "updated",
            };
            format!("{}: {action}", outcome.record.name)
        })
        .collect()
}

/// Cancels the token on the first Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
}

// ============================================================================
// SECTION: RBAC Commands
// ============================================================================

/// Executes `rbac can`.
fn command_rbac_can(rbac: &RbacConfig, command: &RbacCanCommand) -> CliResult<ExitCode> {
    let resource = ResourceType::parse(&command.resource)
        .ok_or_else(|| CliError::new(format!("unknown resource type '{}'", command.resource)))?;
    let action = Action::parse(&command.action)
        .ok_or_else(|| CliError::new(format!("unknown action '{}'", command.action)))?;
    let object = parse_object_id(&command.object)?;
    let subject = SubjectId::new(command.subject.as_str());
    let authorizer = build_authorizer(rbac)?;
    let decision = authorizer
        .authorize(&AccessRequest {
            subject: &subject,
            resource,
            action,
            object: &object,
        })
        .map_err(|err| CliError::new(err.to_string()))?;
    if decision.is_allowed() {
        write_stdout_line("allowed")?;
        Ok(ExitCode::SUCCESS)
    } else {
        write_stdout_line("denied")?;
        Ok(ExitCode::FAILURE)
    }
}

/// Executes `rbac validate`.
fn command_rbac_validate(rbac: &RbacConfig) -> CliResult<ExitCode> {
    let policy = rbac.to_policy().map_err(|err| CliError::new(err.to_string()))?;
    let state = if rbac.enabled { "enforced" } else { "disabled" };
    write_stdout_line(&format!(
        "rbac policy ok: {} roles, {} subjects ({state})",
        policy.role_count(),
        policy.subject_count()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the authorizer selected by the RBAC config.
fn build_authorizer(rbac: &RbacConfig) -> CliResult<Arc<dyn Authorizer>> {
    if !rbac.enabled {
        return Ok(Arc::new(PermitAllAuthorizer));
    }
    let policy = rbac.to_policy().map_err(|err| CliError::new(err.to_string()))?;
    let store = Arc::new(InMemoryPolicyStore::new(policy));
    Ok(Arc::new(PolicyAuthorizer::new(store)))
}

/// Parses an object identifier of the form `namespace/name`.
fn parse_object_id(value: &str) -> CliResult<ObjectId> {
    let parsed = value.split_once('/').and_then(|(namespace, name)| {
        let object = ObjectId::new(namespace, name);
        (!name.contains('/') && object.is_well_formed()).then_some(object)
    });
    parsed.ok_or_else(|| {
        CliError::new(format!("object '{value}' must have the form namespace/name"))
    })
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config validate`; loading already validated the file.
fn command_config_validate() -> CliResult<ExitCode> {
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring Helpers
// ============================================================================

/// Builds the audit sink selected by the audit config.
fn build_audit_sink(audit: &AuditConfig) -> CliResult<Arc<dyn AuditSink>> {
    match (audit.sink, &audit.path) {
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::File, Some(path)) => FileAuditSink::new(path.as_ref())
            .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>)
            .map_err(|err| CliError::new(format!("failed to open audit log {path}: {err}"))),
        (AuditSinkKind::File, None) => Err(CliError::new("audit.path is required for the file sink")),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
