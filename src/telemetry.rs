//! SDK-side tracing.
//!
//! The library only emits `tracing` events and spans. The `connector-sdk`
//! binary installs a stderr subscriber through [`init_tracing`]. Every platform
//! request carries an `x-request-id`; callers pin one id across several calls
//! by running them inside [`with_trace_context`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_log::LogTracer;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt};

use crate::config::SdkConfig;

/// Correlation id reused by every platform request issued inside
/// [`with_trace_context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
}

impl TraceContext {
    pub fn new<S: Into<String>>(trace_id: S) -> Self {
        Self {
            trace_id: trace_id.into(),
        }
    }

    /// Context with a fresh v4 uuid.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

task_local! {
    static CURRENT_CONTEXT: TraceContext;
}

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },
    #[error("another tracing subscriber is already installed: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

static SUBSCRIBER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the CLI subscriber: `RUST_LOG` (or `log_level`) filtering, json or
/// pretty output on stderr so stdout stays reserved for command results.
///
/// Repeated calls are no-ops. Applications embedding the SDK with their own
/// subscriber should skip this.
pub fn init_tracing(config: &SdkConfig) -> Result<(), TelemetryInitError> {
    if SUBSCRIBER_INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let result = install_subscriber(config);
    if result.is_err() {
        SUBSCRIBER_INSTALLED.store(false, Ordering::SeqCst);
    }
    result
}

fn install_subscriber(config: &SdkConfig) -> Result<(), TelemetryInitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => log_filter(&config.log_level)?,
    };

    let output = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        _ => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(output);
    tracing::subscriber::set_global_default(subscriber)?;

    // reqwest and hyper log through the `log` facade.
    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        tracing::warn!(error = %err, "`log` records from dependencies will not be captured");
    }

    Ok(())
}

fn log_filter(directive: &str) -> Result<EnvFilter, TelemetryInitError> {
    EnvFilter::try_new(directive).map_err(|source| TelemetryInitError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Run `future` with `context` as the active correlation id.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_CONTEXT.scope(context, future).await
}

pub fn current_trace_id() -> Option<String> {
    CURRENT_CONTEXT.try_with(|ctx| ctx.trace_id.clone()).ok()
}

/// Id sent as `x-request-id`: the active trace id, or a fresh uuid per call.
pub fn request_id() -> String {
    current_trace_id().unwrap_or_else(|| TraceContext::generate().trace_id)
}
