use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rustsnap::commands::{self, CommandContext, PowerAction};

#[derive(Parser)]
#[command(name = "rustsnap", version)]
#[command(about = "Manage EC2 instances, their volumes and their snapshots")]
struct Cli {
    /// AWS credential profile to use
    #[arg(long, global = true, default_value = "rustsnap")]
    profile: String,

    /// AWS region (defaults to the profile's region)
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commands for snapshots
    #[command(subcommand)]
    Snapshots(SnapshotCommands),
    /// Commands for volumes
    #[command(subcommand)]
    Volumes(VolumeCommands),
    /// Commands for instances
    #[command(subcommand)]
    Instances(InstanceCommands),
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// List EC2 volume snapshots
    List {
        /// Only snapshots for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only snapshots for a single instance id
        #[arg(long)]
        instance: Option<String>,
        /// List all snapshots for each volume, not just the most recent
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum VolumeCommands {
    /// List EC2 volumes
    List {
        /// Only volumes for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only volumes for a single instance id
        #[arg(long)]
        instance: Option<String>,
    },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// List EC2 instances
    List {
        /// Only instances for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only a single instance id
        #[arg(long)]
        instance: Option<String>,
    },
    /// Create snapshots of all volumes of the matched instances
    Snapshot {
        /// Only instances for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only a single instance id
        #[arg(long)]
        instance: Option<String>,
        /// Actually create the snapshots
        #[arg(long)]
        force: bool,
    },
    /// Stop EC2 instances
    Stop {
        /// Only instances for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only a single instance id
        #[arg(long)]
        instance: Option<String>,
        /// Actually stop the instances
        #[arg(long)]
        force: bool,
    },
    /// Start EC2 instances
    Start {
        /// Only instances for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only a single instance id
        #[arg(long)]
        instance: Option<String>,
        /// Actually start the instances
        #[arg(long)]
        force: bool,
    },
    /// Reboot EC2 instances
    Reboot {
        /// Only instances for project (tag Project:<name>)
        #[arg(long)]
        project: Option<String>,
        /// Only a single instance id
        #[arg(long)]
        instance: Option<String>,
        /// Actually reboot the instances
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CommandContext {
        profile: cli.profile,
        region: cli.region,
    };

    match cli.command {
        Commands::Snapshots(SnapshotCommands::List { project, instance, all }) => {
            commands::list_snapshots(&ctx, project.as_deref(), instance.as_deref(), all).await?;
        }
        Commands::Volumes(VolumeCommands::List { project, instance }) => {
            commands::list_volumes(&ctx, project.as_deref(), instance.as_deref()).await?;
        }
        Commands::Instances(InstanceCommands::List { project, instance }) => {
            commands::list_instances(&ctx, project.as_deref(), instance.as_deref()).await?;
        }
        Commands::Instances(InstanceCommands::Snapshot { project, instance, force }) => {
            commands::snapshot_instances(&ctx, project.as_deref(), instance.as_deref(), force)
                .await?;
        }
        Commands::Instances(InstanceCommands::Stop { project, instance, force }) => {
            commands::power_instances(
                &ctx,
                PowerAction::Stop,
                project.as_deref(),
                instance.as_deref(),
                force,
            )
            .await?;
        }
        Commands::Instances(InstanceCommands::Start { project, instance, force }) => {
            commands::power_instances(
                &ctx,
                PowerAction::Start,
                project.as_deref(),
                instance.as_deref(),
                force,
            )
            .await?;
        }
        Commands::Instances(InstanceCommands::Reboot { project, instance, force }) => {
            commands::power_instances(
                &ctx,
                PowerAction::Reboot,
                project.as_deref(),
                instance.as_deref(),
                force,
            )
            .await?;
        }
    }

    Ok(())
}
