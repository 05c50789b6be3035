//! # sprachrohr-observability
//!
//! - Structured Logging via tracing-subscriber (text oder JSON)
//! - Prometheus-Metriken der Audio-Pipeline, exportiert im Textformat

pub mod logging;
pub mod metrics;

pub use logging::logging_initialisieren;
pub use metrics::PipelineMetriken;
