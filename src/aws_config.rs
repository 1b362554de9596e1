use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client as Ec2Client;
use aws_types::region::Region;
use configparser::ini::Ini;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Load the SDK configuration for a named profile, with an optional region
/// override taking precedence over the profile's default region.
pub async fn configure_aws(profile: &str, region: Option<String>) -> aws_types::SdkConfig {
    let region_provider =
        RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();

    aws_config::defaults(BehaviorVersion::v2024_03_28())
        .profile_name(profile)
        .region(region_provider)
        .load()
        .await
}

/// Build an EC2 client bound to the given profile's credentials.
///
/// The profile must exist in `~/.aws/credentials` or `~/.aws/config`;
/// a missing or unparseable profile aborts the whole command.
pub async fn ec2_client(profile: &str, region: Option<String>) -> Result<Ec2Client> {
    ensure_profile_exists(profile)?;

    let config = configure_aws(profile, region).await;
    tracing::debug!(profile, region = ?config.region(), "loaded AWS configuration");

    Ok(Ec2Client::new(&config))
}

fn aws_file(name: &str) -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".aws").join(name))
}

fn file_sections(path: Option<PathBuf>) -> Result<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut ini = Ini::new_cs();
    ini.load(&path)
        .map_err(|e| Error::Credentials(format!("{}: {}", path.display(), e)))?;
    Ok(ini.sections())
}

/// Check that `profile` is configured locally before handing it to the SDK.
///
/// Credentials file sections are named `[NAME]`; the config file uses
/// `[profile NAME]` for everything except `default`.
fn ensure_profile_exists(profile: &str) -> Result<()> {
    let mut sections = file_sections(aws_file("credentials"))?;
    sections.extend(file_sections(aws_file("config"))?);

    let config_section = format!("profile {}", profile);
    if sections.iter().any(|s| s == profile || s == &config_section) {
        Ok(())
    } else {
        Err(Error::ProfileNotFound(profile.to_string()))
    }
}
