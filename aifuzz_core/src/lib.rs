pub mod config;
pub mod detector;
pub mod engine;
pub mod observer;
pub mod oracle;
pub mod path_source;
pub mod report;
pub mod task;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::{AifuzzConfig, ConfigError};
pub use detector::{CommandDetector, CommandDetectorConfig, DetectionError, Detector};
pub use engine::{FuzzConfig, FuzzEngine};
pub use observer::{CountingObserver, NoOpObserver, Observer};
pub use oracle::{Classification, Oracle, StatusOracle};
pub use path_source::{
    GeminiPathSource, GeminiSettings, GenerationError, PathSource, WordlistPathSource, parse_paths,
};
pub use report::{ReportError, ReportLine, Summary};
pub use task::{ProbeResult, ProbeTask};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportSettings};
