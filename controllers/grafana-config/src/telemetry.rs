//! Error and event reporting.
//!
//! The reconciler never returns errors to its caller. Everything it wants an
//! operator to see goes through a [`Reporter`], tagged with the ConfigMap and
//! file it was working on.

use crate::metrics::Metrics;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Report severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context attached to every report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub operation: String,
    pub namespace: Option<String>,
    pub config_map: Option<String>,
    pub file: Option<String>,
    pub resource: Option<String>,
    pub uid: Option<String>,
    pub endpoint: Option<String>,
}

impl Tags {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    /// Same context, different operation
    #[must_use]
    pub fn for_operation(&self, operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_config_map(mut self, namespace: &str, name: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self.config_map = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    #[must_use]
    pub fn with_uid(mut self, uid: &str) -> Self {
        self.uid = Some(uid.to_string());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }
}

/// Sink for errors and notable events
pub trait Reporter: Send + Sync {
    /// Report a failure
    fn capture_error(&self, error: &(dyn std::error::Error + 'static), tags: &Tags);

    /// Report a message at the given severity
    fn capture_message(&self, severity: Severity, message: &str, tags: &Tags);
}

/// Render an error with its sources, skipping causes already in the message
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Reporter that writes structured tracing events and counts reports
pub struct LogReporter {
    metrics: Option<Arc<Metrics>>,
}

impl LogReporter {
    pub fn new(metrics: Option<Arc<Metrics>>) -> Self {
        Self { metrics }
    }

    fn count(&self, severity: Severity, tags: &Tags) {
        if let Some(metrics) = &self.metrics {
            metrics.record_report(severity, &tags.operation);
        }
    }
}

impl Reporter for LogReporter {
    fn capture_error(&self, err: &(dyn std::error::Error + 'static), tags: &Tags) {
        self.count(Severity::Error, tags);
        let message = error_chain(err);
        error!(
            operation = %tags.operation,
            namespace = tags.namespace.as_deref(),
            config_map = tags.config_map.as_deref(),
            file = tags.file.as_deref(),
            resource = tags.resource.as_deref(),
            uid = tags.uid.as_deref(),
            endpoint = tags.endpoint.as_deref(),
            "{}",
            message
        );
    }

    fn capture_message(&self, severity: Severity, message: &str, tags: &Tags) {
        self.count(severity, tags);
        macro_rules! emit {
            ($level:ident) => {
                $level!(
                    operation = %tags.operation,
                    namespace = tags.namespace.as_deref(),
                    config_map = tags.config_map.as_deref(),
                    file = tags.file.as_deref(),
                    resource = tags.resource.as_deref(),
                    uid = tags.uid.as_deref(),
                    endpoint = tags.endpoint.as_deref(),
                    "{}",
                    message
                )
            };
        }
        match severity {
            Severity::Info => emit!(info),
            Severity::Warning => emit!(warn),
            Severity::Error => emit!(error),
        }
    }
}
