use anyhow::Result;

/// Builds a settings struct from the process environment.
///
/// Implementations are called once during startup; the result is passed
/// explicitly to whatever needs it rather than stored globally.
pub trait ConfigBuilder: Sized + Clone + Send + Sync + 'static {
    fn build() -> Result<Self>;
}
