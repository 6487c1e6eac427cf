use serde::Deserialize;

/// Options for opening a [`TransactionScope`](crate::TransactionScope).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Refuse to begin when the driver does not advertise transaction support.
    pub require_transaction_feature: bool,
    /// Tag attached to the scope's log events.
    pub label: Option<String>,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            require_transaction_feature: true,
            label: None,
        }
    }
}

impl TransactionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn builder() -> TransactionOptionsBuilder {
        TransactionOptionsBuilder::new()
    }

    pub(crate) fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

/// Fluent builder for transaction options.
#[derive(Debug, Clone, Default)]
pub struct TransactionOptionsBuilder {
    opts: TransactionOptions,
}

impl TransactionOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn require_transaction_feature(mut self, require: bool) -> Self {
        self.opts.require_transaction_feature = require;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.opts.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> TransactionOptions {
        self.opts
    }
}
