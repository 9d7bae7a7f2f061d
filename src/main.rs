// Anvil CLI - Minimal Server Provisioning

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use anvil::actions::{Action, CreateUser, InstallPackage, ServiceAction, ServiceOperation};
use anvil::config::{load_inventory, ExecutorConfig, ExecutorMode, HostSpec};
use anvil::executor::SshOptions;
use anvil::os::Distribution;
use anvil::output::{
    print_error, print_os_info, print_recipe_header, print_recipes, print_success, suggest_fix,
    ActionError, AnvilError, TerminalObserver,
};
use anvil::recipe::default_registry;
use anvil::runner::Runner;

#[derive(Parser)]
#[command(
    name = "anvil",
    about = "Minimal server provisioning",
    version,
    disable_colored_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print the commands that would run without running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Comma-separated target list (user@host[:port],...)
    #[arg(short = 'H', long, global = true)]
    hosts: Option<String>,

    /// Path to a YAML inventory file
    #[arg(short, long, global = true)]
    inventory: Option<PathBuf>,

    /// Run on every host at once, even with a single host
    #[arg(long, global = true)]
    parallel: bool,

    /// Skip OS detection (debian, ubuntu, fedora, redhat)
    #[arg(long, global = true)]
    os: Option<Distribution>,

    /// Abort the whole operation after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// SSH private key file
    #[arg(long, global = true)]
    private_key: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
#[command(disable_colored_help = true)]
enum Commands {
    /// Ensure a user exists
    CreateUser {
        username: String,

        /// Supplementary group to add the user to
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Install a package
    InstallPackage {
        package: String,

        /// Refresh package lists first
        #[arg(short, long)]
        update: bool,
    },

    /// Remove a package
    RemovePackage { package: String },

    /// Refresh package lists and upgrade installed packages
    UpdatePackages,

    /// Start, stop, enable or restart a service
    Service {
        operation: ServiceOperation,
        service: String,
    },

    /// Run a built-in recipe
    Recipe {
        name: Option<String>,

        /// List available recipes
        #[arg(short, long)]
        list: bool,
    },

    /// Show what the target OS was detected as
    DetectOs,
}

fn init_tracing(verbose: bool) {
    let default_directives = if verbose { "anvil=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let hint = suggest_fix(&e);
        print_error(&e.to_string(), hint.as_deref());
        std::process::exit(1);
    }
}

/// Resolve targets: `--hosts` wins over the inventory file
fn resolve_hosts(cli: &Cli) -> Result<Vec<HostSpec>, AnvilError> {
    if let Some(ref hosts) = cli.hosts {
        return Ok(HostSpec::parse_list(hosts)?);
    }
    if let Some(ref path) = cli.inventory {
        return Ok(load_inventory(path)?);
    }
    Ok(Vec::new())
}

fn executor_config(cli: &Cli) -> Result<ExecutorConfig, AnvilError> {
    let hosts = resolve_hosts(cli)?;
    let mode = ExecutorMode::infer(cli.dry_run, cli.parallel, hosts.len());

    let mut ssh = SshOptions::default();
    if let Some(ref key) = cli.private_key {
        ssh = ssh.with_private_key(key.clone());
    }

    let mut config = ExecutorConfig::new(mode).with_hosts(hosts).with_ssh(ssh);
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), AnvilError> {
    let registry = Arc::new(default_registry());

    if let Commands::Recipe { name: None, .. } | Commands::Recipe { list: true, .. } = cli.command {
        print_recipes(&registry.list());
        return Ok(());
    }

    let config = executor_config(&cli)?;
    let ctx = config.context();

    // Ctrl-C cancels in-flight commands on every target
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let observer = Arc::new(TerminalObserver::new(cli.verbose, cli.quiet));
    let mut runner = Runner::new(config.build()?)
        .with_observer(observer)
        .with_context(ctx);

    match cli.os {
        Some(distribution) => runner = runner.with_distribution(distribution),
        // The introspection command never really runs in a dry run
        None if config.mode == ExecutorMode::DryRun => {
            warn!("dry run without --os, assuming ubuntu");
            runner = runner.with_distribution(Distribution::Ubuntu);
        }
        None => {}
    }

    let (action, success) = match cli.command {
        Commands::CreateUser { username, group } => {
            let mut action = CreateUser::new(&username);
            if let Some(group) = group {
                action = action.with_group(group);
            }
            (Action::from(action), format!("User {} is present", username))
        }
        Commands::InstallPackage { package, update } => {
            let mut action = InstallPackage::new(&package);
            if update {
                action = action.with_update();
            }
            (
                Action::from(action),
                format!("Package {} installed successfully", package),
            )
        }
        Commands::RemovePackage { package } => (
            Action::remove_package(&package),
            format!("Package {} removed successfully", package),
        ),
        Commands::UpdatePackages => (
            Action::update_packages(),
            "Packages updated successfully".to_string(),
        ),
        Commands::Service { operation, service } => (
            Action::from(ServiceAction::new(&service, operation)),
            format!("Service {}: {} succeeded", service, operation),
        ),
        Commands::Recipe { name: Some(name), .. } => {
            let Some(recipe) = registry.get(&name) else {
                print_recipes(&registry.list());
                return Err(ActionError::RecipeNotFound(name).into());
            };
            if !cli.quiet {
                print_recipe_header(recipe);
            }
            (
                Action::execute_recipe(&name, registry.clone()),
                format!("Recipe '{}' completed successfully", name),
            )
        }
        Commands::Recipe { name: None, .. } => return Ok(()),
        Commands::DetectOs => {
            let info = runner.detect().await?;
            print_os_info(&info);
            return Ok(());
        }
    };

    runner.run(&action).await?;

    if !cli.quiet {
        print_success(&success);
    }
    Ok(())
}
