use std::fmt::{Debug, Display};
use std::path::PathBuf;

use apkshelf_daemon::http_server::api::client::{ApiClient, ApiError};
use url::Url;

/// Everything a command needs to run.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub client: ApiClient,
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(remote: &Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(remote)?,
            config_path,
        })
    }
}

/// A CLI command.
#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: Display + Debug + Send;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Generate a `Command` subcommand enum plus matching `OpOutput` and
/// `OpError` enums that dispatch to each variant's [`Op`] impl.
#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $ty:ty)),* $(,)?) => {
        #[derive(clap::Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($ty),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$ty as $crate::cli::op::Op>::Output),)*
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(OpOutput::$variant(output) => write!(f, "{}", output),)*
                }
            }
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$ty as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            async fn execute(
                &self,
                ctx: &$crate::cli::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => op
                            .execute(ctx)
                            .await
                            .map(OpOutput::$variant)
                            .map_err(OpError::$variant),
                    )*
                }
            }
        }
    };
}
