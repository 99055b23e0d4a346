use crate::task::ProbeResult;
use std::fmt;

/// How a finished probe is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    /// 2xx: the resource exists and was served.
    Hit,
    /// 403: the resource exists but access is denied.
    Forbidden,
    /// 404.
    Absent,
    /// Any other status code.
    Other,
    /// No response was received.
    Error,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Hit,
        Classification::Forbidden,
        Classification::Absent,
        Classification::Other,
        Classification::Error,
    ];

    /// Label printed in front of each result line.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Hit => "FOUND",
            Classification::Forbidden => "FORBIDDEN",
            Classification::Absent => "NOT FOUND",
            Classification::Other => "OTHER",
            Classification::Error => "ERROR",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An `Oracle` looks at a finished probe and decides what it means.
///
/// It only reads the fields of the result; it never goes back to the network.
pub trait Oracle: Send + Sync {
    /// Decides which `Classification` a finished probe falls into.
    ///
    /// # Arguments
    /// * `result`: A `ProbeResult` as produced by the engine. It carries either
    ///   a status code or an error, never both.
    ///
    /// # Returns
    /// Exactly one `Classification`. Results without a status code must map to
    /// `Classification::Error`.
    fn classify(&self, result: &ProbeResult) -> Classification;
}

/// Classifies by status code alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusOracle;

impl StatusOracle {
    pub fn new() -> Self {
        StatusOracle
    }
}

impl Oracle for StatusOracle {
    fn classify(&self, result: &ProbeResult) -> Classification {
        match result.status_code() {
            None => Classification::Error,
            Some(200..=299) => Classification::Hit,
            Some(403) => Classification::Forbidden,
            Some(404) => Classification::Absent,
            Some(_) => Classification::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ProbeTask;
    use url::Url;

    fn task(path: &str) -> ProbeTask {
        ProbeTask::new(&Url::parse("http://example.com").unwrap(), path)
    }

    #[test]
    fn status_oracle_labels_each_class() {
        let oracle = StatusOracle::new();
        let results = [
            ProbeResult::response(&task("/a"), 200),
            ProbeResult::response(&task("/b"), 403),
            ProbeResult::response(&task("/c"), 404),
            ProbeResult::response(&task("/d"), 500),
            ProbeResult::failure(&task("/e"), "timeout"),
        ];

        let classes: Vec<Classification> = results.iter().map(|r| oracle.classify(r)).collect();

        assert_eq!(
            classes,
            vec![
                Classification::Hit,
                Classification::Forbidden,
                Classification::Absent,
                Classification::Other,
                Classification::Error,
            ]
        );
    }

    #[test]
    fn status_oracle_hit_range_is_half_open() {
        let oracle = StatusOracle::new();
        assert_eq!(
            oracle.classify(&ProbeResult::response(&task("/x"), 299)),
            Classification::Hit
        );
        assert_eq!(
            oracle.classify(&ProbeResult::response(&task("/x"), 300)),
            Classification::Other
        );
        assert_eq!(
            oracle.classify(&ProbeResult::response(&task("/x"), 199)),
            Classification::Other
        );
    }
}
