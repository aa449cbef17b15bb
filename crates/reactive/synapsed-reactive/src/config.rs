//! Configuration for subjects

use crate::types::{ReactiveError, ReactiveResult};
use serde::{Deserialize, Serialize};

/// How [`as_channel`](crate::Observable::as_channel) buffers emissions
/// between the producer and a slower consumer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelPolicy {
    /// Never blocks or drops; pending emissions grow without bound while the
    /// consumer lags
    #[default]
    Unbounded,
    /// Holds at most `capacity` pending emissions and drops new ones when full
    DropNewest { capacity: usize },
}

/// Configuration for a [`Subject`](crate::Subject)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    /// Name used in log output
    pub name: Option<String>,
    /// Buffering policy for channel adapters
    pub channel_policy: ChannelPolicy,
}

impl SubjectConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_channel_policy(mut self, policy: ChannelPolicy) -> Self {
        self.channel_policy = policy;
        self
    }

    pub fn validate(&self) -> ReactiveResult<()> {
        if let ChannelPolicy::DropNewest { capacity: 0 } = self.channel_policy {
            return Err(ReactiveError::invalid_config(
                "drop_newest channel capacity must be greater than zero",
            ));
        }
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(ReactiveError::invalid_config("subject name must not be empty"));
        }
        Ok(())
    }
}
