use time::format_description;
use tracing_subscriber::{fmt, EnvFilter, FmtSubscriber};

// Sets up tracing. Goes to stderr, filtered by TRACE env var.
// Levels are: trace, debug, info, warn, error
//
// EnvFilter has a standard syntax, but basically can be boiled down to (for example):
//
// All targets, info level:             info
// All modules under fx, debug level:   ibtax::fx=debug
// Global at info, fx as debug:         info,ibtax::fx=debug
//
// More generally: target[span{field=value}]=level
// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn setup_tracing() {
    let time_format =
        format_description::parse("[hour]:[minute]:[second].[subsecond digits:5]")
            .expect("Time format description is invalid");

    let timer = fmt::time::UtcTime::new(time_format);

    // It will use the TRACE env var for filtering, and is off by default
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_env("TRACE"))
        .with_timer(timer)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
