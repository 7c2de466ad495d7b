use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Installs a stderr subscriber when `THICKET_LOG` or `RUST_LOG` is set, for
/// example `THICKET_LOG=thicket_parse=trace`. `THICKET_LOG` wins when both
/// are. Later calls do nothing.
pub(crate) fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let directives = std::env::var("THICKET_LOG").or_else(|_| std::env::var("RUST_LOG"));
        let Ok(directives) = directives else {
            return;
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::new(directives))
            .init();
    });
}
