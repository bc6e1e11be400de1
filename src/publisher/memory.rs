use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Channel, Publisher};
use crate::errors::{AppError, Result};

/// Records published messages; optionally fails every publish.
#[derive(Default)]
pub(crate) struct MemoryPublisher {
    sent: Mutex<Vec<(Channel, String)>>,
    fail: bool,
}

impl MemoryPublisher {
    pub(crate) fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub(crate) fn all(&self) -> Vec<(Channel, String)> {
        self.sent.lock().clone()
    }

    pub(crate) fn messages(&self, channel: Channel) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, channel: Channel, payload: String) -> Result<()> {
        if self.fail {
            return Err(AppError::Publish(format!("{channel}: store unavailable")));
        }
        self.sent.lock().push((channel, payload));
        Ok(())
    }
}
