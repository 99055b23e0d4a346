use serde::{Deserialize, Serialize};
use url::Url;

/// A single candidate path resolved against the target.
///
/// Tasks are built once before dispatch and never change. A path that cannot
/// be joined onto the base URL still becomes a task: it carries the join error
/// so the engine can report it without touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTask {
    path: String,
    target: Result<Url, String>,
}

impl ProbeTask {
    /// Resolves `path` against `base` with RFC 3986 reference resolution.
    ///
    /// A leading `/` replaces the base path, a relative path resolves against
    /// the last segment of the base.
    pub fn new(base: &Url, path: impl Into<String>) -> Self {
        let path = path.into();
        let target = base
            .join(&path)
            .map_err(|e| format!("Failed to join path onto {base}: {e}"));
        Self { path, target }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The resolved URL, or the reason it could not be resolved.
    pub fn target(&self) -> Result<&Url, &str> {
        self.target.as_ref().map_err(String::as_str)
    }

    /// The URL as it will appear in results. Falls back to the raw path when
    /// resolution failed.
    pub fn display_url(&self) -> String {
        match &self.target {
            Ok(url) => url.to_string(),
            Err(_) => self.path.clone(),
        }
    }
}

/// Outcome of one probe.
///
/// Exactly one of `status_code` and `error` is set. A status code means the
/// HTTP exchange completed, whatever the code was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProbeResult")]
pub struct ProbeResult {
    path: String,
    status_code: Option<u16>,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Persisted record as read back, before the status/error rule is checked.
#[derive(Deserialize)]
struct RawProbeResult {
    path: String,
    status_code: Option<u16>,
    url: String,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<RawProbeResult> for ProbeResult {
    type Error = String;

    fn try_from(raw: RawProbeResult) -> Result<Self, Self::Error> {
        let (status_code, error) = match (raw.status_code, raw.error) {
            (Some(status), None) => (Some(status), None),
            (None, Some(error)) if !error.is_empty() => (None, Some(error)),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "result for {:?} has both a status code and an error",
                    raw.path
                ));
            }
            (None, _) => {
                return Err(format!(
                    "result for {:?} has neither a status code nor an error",
                    raw.path
                ));
            }
        };
        Ok(Self {
            path: raw.path,
            status_code,
            url: raw.url,
            error,
        })
    }
}

impl ProbeResult {
    pub fn response(task: &ProbeTask, status_code: u16) -> Self {
        Self {
            path: task.path.clone(),
            status_code: Some(status_code),
            url: task.display_url(),
            error: None,
        }
    }

    pub fn failure(task: &ProbeTask, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = "unknown transport error".to_string();
        }
        Self {
            path: task.path.clone(),
            status_code: None,
            url: task.display_url(),
            error: Some(error),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/app/index.php").unwrap()
    }

    #[test]
    fn absolute_path_replaces_base_path() {
        let task = ProbeTask::new(&base(), "/admin");
        assert_eq!(task.path(), "/admin");
        assert_eq!(task.target().unwrap().as_str(), "http://example.com/admin");
    }

    #[test]
    fn relative_path_resolves_against_last_segment() {
        let task = ProbeTask::new(&base(), "backup.zip");
        assert_eq!(
            task.target().unwrap().as_str(),
            "http://example.com/app/backup.zip"
        );
    }

    #[test]
    fn failure_result_has_no_status_code() {
        let task = ProbeTask::new(&base(), "/x");
        let result = ProbeResult::failure(&task, "connection refused");
        assert_eq!(result.status_code(), None);
        assert_eq!(result.error(), Some("connection refused"));
        assert_eq!(result.url(), "http://example.com/x");
    }

    #[test]
    fn failure_result_never_carries_an_empty_message() {
        let task = ProbeTask::new(&base(), "/x");
        let result = ProbeResult::failure(&task, "");
        assert!(!result.error().unwrap().is_empty());
    }

    #[test]
    fn serialized_response_omits_error_field() {
        let task = ProbeTask::new(&base(), "/login");
        let json = serde_json::to_value(ProbeResult::response(&task, 403)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "/login",
                "status_code": 403,
                "url": "http://example.com/login",
            })
        );
    }

    #[test]
    fn serialized_failure_has_null_status_and_error() {
        let task = ProbeTask::new(&base(), "/login");
        let json = serde_json::to_value(ProbeResult::failure(&task, "timed out")).unwrap();
        assert_eq!(json["status_code"], serde_json::Value::Null);
        assert_eq!(json["error"], "timed out");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn deserialize_accepts_well_formed_records() {
        let ok: ProbeResult =
            serde_json::from_str(r#"{"path":"/a","status_code":200,"url":"http://h/a"}"#).unwrap();
        assert_eq!(ok.status_code(), Some(200));
        let failed: ProbeResult = serde_json::from_str(
            r#"{"path":"/a","status_code":null,"url":"http://h/a","error":"refused"}"#,
        )
        .unwrap();
        assert_eq!(failed.error(), Some("refused"));
    }

    #[test]
    fn deserialize_rejects_status_and_error_together() {
        let err = serde_json::from_str::<ProbeResult>(
            r#"{"path":"/a","status_code":200,"url":"http://h/a","error":"x"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both"), "{err}");
    }

    #[test]
    fn deserialize_rejects_records_without_status_or_error() {
        for raw in [
            r#"{"path":"/a","status_code":null,"url":"http://h/a"}"#,
            r#"{"path":"/a","url":"http://h/a"}"#,
            r#"{"path":"/a","status_code":null,"url":"http://h/a","error":""}"#,
        ] {
            let err = serde_json::from_str::<ProbeResult>(raw).unwrap_err();
            assert!(err.to_string().contains("neither"), "{raw}: {err}");
        }
    }
}
