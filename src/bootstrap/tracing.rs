
pub async fn init_tracing(){
    // RUST_LOG takes the usual EnvFilter directives, e.g. `goodtables=debug,tower_http=info`.
    // Defaults to "info" when unset or unparsable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}
