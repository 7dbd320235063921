//! Load-failure modeling for the sidebar banner and the host status line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureCategory {
    Network,
    Status,
    Format,
    Unknown,
}

impl LoadFailureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadFailureCategory::Network => "network",
            LoadFailureCategory::Status => "status",
            LoadFailureCategory::Format => "format",
            LoadFailureCategory::Unknown => "unknown",
        }
    }
}

pub fn classify_load_failure(detail: &str) -> LoadFailureCategory {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("http error") || lower.contains("status") {
        LoadFailureCategory::Status
    } else if lower.contains("missing required column")
        || lower.contains("empty")
        || lower.contains("malformed")
    {
        LoadFailureCategory::Format
    } else if lower.contains("network")
        || lower.contains("connection")
        || lower.contains("dns")
        || lower.contains("timed out")
        || lower.contains("failed to read")
    {
        LoadFailureCategory::Network
    } else {
        LoadFailureCategory::Unknown
    }
}

/// Error banner content: the user-facing message, the technical detail and
/// a hint on what retrying can fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadNotice {
    category: LoadFailureCategory,
    detail: String,
    message: String,
}

impl LoadNotice {
    pub fn classify(detail: impl Into<String>, message: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            category: classify_load_failure(&detail),
            detail,
            message: message.into(),
        }
    }

    pub fn category(&self) -> LoadFailureCategory {
        self.category
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_hint(&self) -> &'static str {
        match self.category {
            LoadFailureCategory::Network => "Check the network or source path, then type `reload`.",
            LoadFailureCategory::Status => "The server rejected the request; type `reload` to retry.",
            LoadFailureCategory::Format => {
                "The hospital table is malformed; fix the source, then type `reload`."
            }
            LoadFailureCategory::Unknown => "Type `reload` to try again.",
        }
    }
}
