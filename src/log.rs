//! Logging entry point. The core never installs a logger on its own
//! initiative; a host application calls [`init`] once at startup.

use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Install `env_logger` as the global logger, defaulting to the `warn`
/// level when `RUST_LOG` is unset. Safe to call more than once; only the
/// first call has an effect.
pub fn init() {
    INIT.get_or_init(|| {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("warn"),
        )
        .try_init();
    });
}

/// Runs `$e`, logging and discarding the error at `warn` level on failure.
#[macro_export]
macro_rules! weak_error {
    ($e:expr) => {
        match $e {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    };
}

/// Runs `$e`, logging and discarding the error at `debug` level on failure.
#[macro_export]
macro_rules! muted_error {
    ($e:expr) => {
        match $e {
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("{}", e);
                None
            }
        }
    };
}
