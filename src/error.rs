use aws_sdk_ec2::error::{DisplayErrorContext, SdkError};
use thiserror::Error;

/// Errors surfaced by rustsnap.
#[derive(Error, Debug)]
pub enum Error {
    #[error("profile '{0}' not found in ~/.aws/credentials or ~/.aws/config")]
    ProfileNotFound(String),

    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("EC2 API error: {0}")]
    Api(String),

    #[error("timed out after {timeout_secs}s waiting for instance {instance_id} to become {state}")]
    WaitTimeout {
        instance_id: String,
        state: String,
        timeout_secs: u64,
    },
}

impl Error {
    /// Wrap an SDK operation error, keeping the provider-reported message.
    pub(crate) fn sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        Self::Api(format!("{}", DisplayErrorContext(&err)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
