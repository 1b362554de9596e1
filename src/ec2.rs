use aws_sdk_ec2::types::{Filter, Instance, Snapshot, Volume};
use aws_sdk_ec2::Client as Ec2Client;
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Summary of a remote EC2 instance, fetched fresh on every command.
#[derive(Debug, Clone)]
pub struct Ec2Instance {
    pub id: String,
    pub instance_type: String,
    pub availability_zone: String,
    pub state: String,
    pub public_dns: String,
    pub tags: HashMap<String, String>,
}

impl Ec2Instance {
    pub fn project(&self) -> Option<&str> {
        self.tags.get("Project").map(String::as_str)
    }

    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    fn from_sdk(instance: &Instance) -> Self {
        let tags = instance
            .tags()
            .iter()
            .filter_map(|t| Some((t.key()?.to_string(), t.value()?.to_string())))
            .collect();

        Self {
            id: instance.instance_id().unwrap_or_default().to_string(),
            instance_type: instance
                .instance_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            availability_zone: instance
                .placement()
                .and_then(|p| p.availability_zone())
                .unwrap_or_default()
                .to_string(),
            state: instance
                .state()
                .and_then(|s| s.name())
                .map(|n| n.as_str().to_string())
                .unwrap_or_default(),
            public_dns: instance.public_dns_name().unwrap_or_default().to_string(),
            tags,
        }
    }
}

/// A volume attached to an instance. The instance id comes from the
/// enumeration context, not from a stored back-reference.
#[derive(Debug, Clone)]
pub struct Ec2Volume {
    pub id: String,
    pub instance_id: String,
    pub state: String,
    pub size_gib: i32,
    pub encrypted: bool,
}

impl Ec2Volume {
    fn from_sdk(volume: &Volume, instance_id: &str) -> Self {
        Self {
            id: volume.volume_id().unwrap_or_default().to_string(),
            instance_id: instance_id.to_string(),
            state: volume
                .state()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            size_gib: volume.size().unwrap_or_default(),
            encrypted: volume.encrypted().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ec2Snapshot {
    pub id: String,
    pub volume_id: String,
    pub state: String,
    pub progress: String,
    pub start_time: Option<DateTime>,
}

impl Ec2Snapshot {
    pub fn is_pending(&self) -> bool {
        self.state == "pending"
    }

    pub fn is_completed(&self) -> bool {
        self.state == "completed"
    }

    pub fn start_time_display(&self) -> String {
        self.start_time
            .as_ref()
            .and_then(|t| t.fmt(Format::DateTime).ok())
            .unwrap_or_default()
    }

    fn from_sdk(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.snapshot_id().unwrap_or_default().to_string(),
            volume_id: snapshot.volume_id().unwrap_or_default().to_string(),
            state: snapshot
                .state()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            progress: snapshot.progress().unwrap_or_default().to_string(),
            start_time: snapshot.start_time().cloned(),
        }
    }
}

/// Server-side filters for the instance query. Both options narrow the
/// result; together they intersect.
fn instance_filters(project: Option<&str>, instance_id: Option<&str>) -> Vec<Filter> {
    let mut filters = Vec::new();
    if let Some(id) = instance_id {
        filters.push(Filter::builder().name("instance-id").values(id).build());
    }
    if let Some(project) = project {
        filters.push(Filter::builder().name("tag:Project").values(project).build());
    }
    filters
}

/// Fetch the instances matching the project tag and/or instance id.
/// With neither set, every instance visible to the credentials is returned.
pub async fn filter_instances(
    client: &Ec2Client,
    project: Option<&str>,
    instance_id: Option<&str>,
) -> Result<Vec<Ec2Instance>> {
    let filters = instance_filters(project, instance_id);
    let mut request = client.describe_instances();
    if !filters.is_empty() {
        request = request.set_filters(Some(filters));
    }

    let mut pages = request.into_paginator().items().send();
    let mut instances = Vec::new();
    while let Some(reservation) = pages.next().await {
        let reservation = reservation.map_err(Error::sdk)?;
        for instance in reservation.instances() {
            instances.push(Ec2Instance::from_sdk(instance));
        }
    }

    tracing::debug!(count = instances.len(), "matched instances");
    Ok(instances)
}

pub async fn volumes_for_instance(
    client: &Ec2Client,
    instance_id: &str,
) -> Result<Vec<Ec2Volume>> {
    let mut pages = client
        .describe_volumes()
        .filters(
            Filter::builder()
                .name("attachment.instance-id")
                .values(instance_id)
                .build(),
        )
        .into_paginator()
        .items()
        .send();

    let mut volumes = Vec::new();
    while let Some(volume) = pages.next().await {
        let volume = volume.map_err(Error::sdk)?;
        volumes.push(Ec2Volume::from_sdk(&volume, instance_id));
    }
    Ok(volumes)
}

/// Snapshots of a volume, newest first. The provider's ordering is not
/// guaranteed chronological, so the sort makes "most recent" well-defined.
pub async fn snapshots_for_volume(
    client: &Ec2Client,
    volume_id: &str,
) -> Result<Vec<Ec2Snapshot>> {
    let mut pages = client
        .describe_snapshots()
        .filters(Filter::builder().name("volume-id").values(volume_id).build())
        .into_paginator()
        .items()
        .send();

    let mut snapshots = Vec::new();
    while let Some(snapshot) = pages.next().await {
        let snapshot = snapshot.map_err(Error::sdk)?;
        snapshots.push(Ec2Snapshot::from_sdk(&snapshot));
    }

    latest_first(&mut snapshots);
    Ok(snapshots)
}

fn latest_first(snapshots: &mut [Ec2Snapshot]) {
    snapshots.sort_by(|a, b| time_key(b).cmp(&time_key(a)));
}

fn time_key(snapshot: &Ec2Snapshot) -> Option<(i64, u32)> {
    snapshot
        .start_time
        .as_ref()
        .map(|t| (t.secs(), t.subsec_nanos()))
}

fn first_is_pending(snapshots: &[Ec2Snapshot]) -> bool {
    snapshots.first().map(Ec2Snapshot::is_pending).unwrap_or(false)
}

/// True when the volume's most recent snapshot is still in progress.
/// A volume with no snapshots has nothing pending.
pub async fn has_pending_snapshot(client: &Ec2Client, volume_id: &str) -> Result<bool> {
    let snapshots = snapshots_for_volume(client, volume_id).await?;
    Ok(first_is_pending(&snapshots))
}

pub async fn stop_instance(client: &Ec2Client, instance_id: &str) -> Result<()> {
    client
        .stop_instances()
        .instance_ids(instance_id)
        .send()
        .await
        .map_err(Error::sdk)?;
    Ok(())
}

pub async fn start_instance(client: &Ec2Client, instance_id: &str) -> Result<()> {
    client
        .start_instances()
        .instance_ids(instance_id)
        .send()
        .await
        .map_err(Error::sdk)?;
    Ok(())
}

pub async fn reboot_instance(client: &Ec2Client, instance_id: &str) -> Result<()> {
    client
        .reboot_instances()
        .instance_ids(instance_id)
        .send()
        .await
        .map_err(Error::sdk)?;
    Ok(())
}

pub async fn create_snapshot(
    client: &Ec2Client,
    volume_id: &str,
    description: &str,
) -> Result<String> {
    let resp = client
        .create_snapshot()
        .volume_id(volume_id)
        .description(description)
        .send()
        .await
        .map_err(Error::sdk)?;
    Ok(resp.snapshot_id().unwrap_or_default().to_string())
}

/// Block until the instance reports the target state name.
///
/// Explicit poll loop: describe every 5s, give up after 300s. The calling
/// command suspends entirely until the state is reached or the timeout
/// fires.
pub async fn wait_for_state(client: &Ec2Client, instance_id: &str, target: &str) -> Result<()> {
    let started = Instant::now();
    loop {
        let state = instance_state(client, instance_id).await?;
        if state == target {
            return Ok(());
        }
        if started.elapsed() >= WAIT_TIMEOUT {
            return Err(Error::WaitTimeout {
                instance_id: instance_id.to_string(),
                state: target.to_string(),
                timeout_secs: WAIT_TIMEOUT.as_secs(),
            });
        }
        tracing::debug!(instance_id, %state, target, "waiting for state transition");
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }
}

async fn instance_state(client: &Ec2Client, instance_id: &str) -> Result<String> {
    let resp = client
        .describe_instances()
        .instance_ids(instance_id)
        .send()
        .await
        .map_err(Error::sdk)?;

    Ok(resp
        .reservations()
        .iter()
        .flat_map(|r| r.instances())
        .find(|i| i.instance_id() == Some(instance_id))
        .and_then(|i| i.state())
        .and_then(|s| s.name())
        .map(|n| n.as_str().to_string())
        .unwrap_or_default())
}
