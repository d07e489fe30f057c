use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{filter, EnvFilter, Layer};

mod fmt;

pub use fmt::LogFormat;

use crate::fmt::LocalTime;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str =
    "deployer=info,declare=info,executor=debug,manifest=info,rpc=info,cofi_deploy=info,warn";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse environment filter: {0}")]
    EnvFilterParse(#[from] filter::ParseError),

    #[error("failed to set global subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Installs the global tracing subscriber.
///
/// If the `RUST_LOG` environment variable is set it takes precedence over `filter`, which in turn
/// defaults to [`DEFAULT_LOG_FILTER`].
pub fn init(format: LogFormat, filter: Option<&str>) -> Result<(), Error> {
    let default_filter = EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER));
    let filter = EnvFilter::try_from_default_env().or(default_filter)?;

    let fmt = match format {
        LogFormat::Full => tracing_subscriber::fmt::layer().with_timer(LocalTime::new()).boxed(),
        LogFormat::Json => {
            tracing_subscriber::fmt::layer().json().with_timer(LocalTime::new()).boxed()
        }
    };

    tracing_subscriber::registry().with(filter).with(fmt).try_init()?;

    Ok(())
}
