use tracing_core::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, registry};

/// If a global tracing subscriber is not already configured, log to stderr and add a panic hook
/// logging the panic.
///
/// Records emitted through the `log` facade are forwarded to the subscriber. Returns whether the
/// logger was installed.
pub fn init_log(verbose: bool) -> bool {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level);

    let installed = registry().with(layer).try_init().is_ok();
    if installed {
        update_panic_hook();
    }
    installed
}

fn update_panic_hook() {
    let hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC => {info}");
        hook(info);
    }));
}
