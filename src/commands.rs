use aws_sdk_ec2::Client as Ec2Client;

use crate::aws_config;
use crate::ec2::{self, Ec2Instance, Ec2Snapshot};
use crate::error::Result;

const SNAPSHOT_DESCRIPTION: &str = "Created by rustsnap";

/// Options shared by every subcommand, built once in main and passed to
/// each handler by parameter.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub profile: String,
    pub region: Option<String>,
}

impl CommandContext {
    async fn client(&self) -> Result<Ec2Client> {
        aws_config::ec2_client(&self.profile, self.region.clone()).await
    }
}

/// Rows shown per volume: everything with --all, otherwise stop after the
/// first completed snapshot. Snapshots arrive newest first, so that row is
/// the most recent finished one.
fn visible_snapshots(snapshots: &[Ec2Snapshot], all: bool) -> &[Ec2Snapshot] {
    if all {
        return snapshots;
    }
    match snapshots.iter().position(Ec2Snapshot::is_completed) {
        Some(idx) => &snapshots[..=idx],
        None => snapshots,
    }
}

pub async fn list_snapshots(
    ctx: &CommandContext,
    project: Option<&str>,
    instance: Option<&str>,
    all: bool,
) -> Result<()> {
    let client = ctx.client().await?;

    for inst in ec2::filter_instances(&client, project, instance).await? {
        for volume in ec2::volumes_for_instance(&client, &inst.id).await? {
            let snapshots = ec2::snapshots_for_volume(&client, &volume.id).await?;
            for snapshot in visible_snapshots(&snapshots, all) {
                println!(
                    "{}, {}, {}, {}, {}, {}",
                    snapshot.id,
                    volume.id,
                    inst.id,
                    snapshot.state,
                    snapshot.progress,
                    snapshot.start_time_display()
                );
            }
        }
    }
    Ok(())
}

pub async fn list_volumes(
    ctx: &CommandContext,
    project: Option<&str>,
    instance: Option<&str>,
) -> Result<()> {
    let client = ctx.client().await?;

    for inst in ec2::filter_instances(&client, project, instance).await? {
        for volume in ec2::volumes_for_instance(&client, &inst.id).await? {
            println!(
                "{}, {}, {}, {}GiB, {}",
                volume.id,
                inst.id,
                volume.state,
                volume.size_gib,
                if volume.encrypted { "Encrypted" } else { "Not Encrypted" }
            );
        }
    }
    Ok(())
}

pub async fn list_instances(
    ctx: &CommandContext,
    project: Option<&str>,
    instance: Option<&str>,
) -> Result<()> {
    let client = ctx.client().await?;

    for inst in ec2::filter_instances(&client, project, instance).await? {
        println!(
            "{}, {}, {}, {}, {}, {}",
            inst.id,
            inst.instance_type,
            inst.availability_zone,
            inst.state,
            inst.public_dns,
            inst.project().unwrap_or("<no project>")
        );
    }
    Ok(())
}

/// Snapshot every volume of every matched instance.
///
/// Stops each instance first and blocks until it is stopped; restarts it
/// afterwards only if it was running when we found it. One failing
/// instance or volume does not abort the rest of the batch.
pub async fn snapshot_instances(
    ctx: &CommandContext,
    project: Option<&str>,
    instance: Option<&str>,
    force: bool,
) -> Result<()> {
    let client = ctx.client().await?;

    for inst in ec2::filter_instances(&client, project, instance).await? {
        if !force {
            println!(
                "Snapshot of instance {} volumes declined. Use --force to create snapshots",
                inst.id
            );
            continue;
        }

        if let Err(err) = snapshot_one_instance(&client, &inst).await {
            println!("Could not snapshot {}. {}", inst.id, err);
        }
    }
    Ok(())
}

async fn snapshot_one_instance(client: &Ec2Client, instance: &Ec2Instance) -> Result<()> {
    let was_running = instance.is_running();

    println!("Stopping {} ...", instance.id);
    ec2::stop_instance(client, &instance.id).await?;
    ec2::wait_for_state(client, &instance.id, "stopped").await?;

    for volume in ec2::volumes_for_instance(client, &instance.id).await? {
        if ec2::has_pending_snapshot(client, &volume.id).await? {
            println!("  Skipping {}, snapshot already in progress", volume.id);
            continue;
        }

        println!("  Creating snapshot of {}", volume.id);
        if let Err(err) = ec2::create_snapshot(client, &volume.id, SNAPSHOT_DESCRIPTION).await {
            println!("  Could not snapshot {}. {}", volume.id, err);
        }
    }

    if was_running {
        println!("Starting {} ...", instance.id);
        ec2::start_instance(client, &instance.id).await?;
        ec2::wait_for_state(client, &instance.id, "running").await?;
    }

    println!("Job done!");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Stop,
    Start,
    Reboot,
}

impl PowerAction {
    fn verb(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Reboot => "reboot",
        }
    }

    fn gerund(self) -> &'static str {
        match self {
            Self::Stop => "Stopping",
            Self::Start => "Starting",
            Self::Reboot => "Rebooting",
        }
    }

    async fn apply(self, client: &Ec2Client, instance_id: &str) -> Result<()> {
        match self {
            Self::Stop => ec2::stop_instance(client, instance_id).await,
            Self::Start => ec2::start_instance(client, instance_id).await,
            Self::Reboot => ec2::reboot_instance(client, instance_id).await,
        }
    }
}

/// Stop, start or reboot each matched instance. Requires --force per
/// instance; a provider error on one instance is logged and the loop
/// moves on.
pub async fn power_instances(
    ctx: &CommandContext,
    action: PowerAction,
    project: Option<&str>,
    instance: Option<&str>,
    force: bool,
) -> Result<()> {
    let client = ctx.client().await?;

    for inst in ec2::filter_instances(&client, project, instance).await? {
        if !force {
            println!(
                "{} {} declined. Use --force to {}",
                action.gerund(),
                inst.id,
                action.verb()
            );
            continue;
        }

        println!("{} {}...", action.gerund(), inst.id);
        if let Err(err) = action.apply(&client, &inst.id).await {
            println!("Could not {} {}. {}", action.verb(), inst.id, err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_smithy_types::DateTime;

    fn snapshot(id: &str, state: &str, secs: i64) -> Ec2Snapshot {
        Ec2Snapshot {
            id: id.to_string(),
            volume_id: "vol-0123456789abcdef0".to_string(),
            state: state.to_string(),
            progress: "100%".to_string(),
            start_time: Some(DateTime::from_secs(secs)),
        }
    }

    #[test]
    fn listing_stops_at_first_completed_snapshot() {
        let snaps = [snapshot("snap-a", "completed", 300), snapshot("snap-b", "pending", 200)];
        let shown = visible_snapshots(&snaps, false);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "snap-a");
    }

    #[test]
    fn listing_includes_leading_pending_snapshots() {
        let snaps = [snapshot("snap-a", "pending", 300), snapshot("snap-b", "completed", 200)];
        let shown = visible_snapshots(&snaps, false);
        assert_eq!(shown.len(), 2);
    }

    #[test]
    fn listing_all_shows_everything() {
        let snaps = [
            snapshot("snap-a", "completed", 300),
            snapshot("snap-b", "completed", 200),
            snapshot("snap-c", "pending", 100),
        ];
        assert_eq!(visible_snapshots(&snaps, true).len(), 3);
    }

    #[test]
    fn listing_without_completed_shows_everything() {
        let snaps = [snapshot("snap-a", "pending", 300), snapshot("snap-b", "error", 200)];
        assert_eq!(visible_snapshots(&snaps, false).len(), 2);
    }

    #[test]
    fn power_action_wording() {
        assert_eq!(PowerAction::Stop.gerund(), "Stopping");
        assert_eq!(PowerAction::Start.verb(), "start");
        assert_eq!(PowerAction::Reboot.verb(), "reboot");
    }
}
