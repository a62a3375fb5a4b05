use crate::error::Result;
use log::info;
use std::sync::{Mutex, OnceLock};

static EXIT_HANDLER_STATE: OnceLock<Mutex<bool>> = OnceLock::new();

fn inner_setup(on_exit: impl Fn() + Send + 'static) -> Result<()> {
    #[cfg(unix)]
    {
        use signal_hook::{
            consts::{SIGHUP, SIGINT, SIGTERM},
            iterator::Signals,
        };
        use std::thread::Builder;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP]).map_err(|e| {
            crate::error::WorkerError::SignalHandling {
                source: Box::new(e),
            }
        })?;

        Builder::new()
            .name("signal-listener".into())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!("Received signal: {sig}");
                    on_exit();
                }
            })?;
    }

    #[cfg(windows)]
    {
        ctrlc::set_handler(move || {
            info!("Received Ctrl-C");
            on_exit();
        })?;
    }

    Ok(())
}

/// Calls `on_exit` once a termination signal arrives.
///
/// Only the first call installs anything; later calls are no-ops.
pub fn setup_exit_handler(on_exit: impl Fn() + Send + 'static) -> Result<()> {
    let m = EXIT_HANDLER_STATE.get_or_init(|| Mutex::new(false));
    let mut inited = m.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if *inited {
        return Ok(());
    }

    inner_setup(on_exit)?;
    *inited = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    #[test]
    fn test_setup_is_idempotent() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        setup_exit_handler(move || flag.store(true, Ordering::Relaxed)).unwrap();
        setup_exit_handler(|| {}).unwrap();
        assert!(!fired.load(Ordering::Relaxed));
    }
}
