#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("{0}")]
    InsufficientPermission(String),
    #[error("collector error: {0}")]
    Collector(String),
    #[error("counter source error: {0}")]
    CounterSource(String),
    #[error("event stream error: {0}")]
    EventStream(String),
    #[error("serialization error: {0}")]
    Serialization(#[source] std::io::Error),
    #[error("TUI error: {0}")]
    Tui(#[source] std::io::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}
