//! Test doubles shared by the scheduler test modules.

use async_trait::async_trait;
use shiftminus_core::traits::Messenger;
use shiftminus_core::types::{Delivery, PushTarget};
use std::sync::Mutex;

/// Records every push and answers with a fixed delivery.
pub struct RecordingMessenger {
    sent: Mutex<Vec<(PushTarget, String)>>,
    reply: Delivery,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::replying(Delivery::Sent { attempts: 1 })
    }

    pub fn replying(reply: Delivery) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reply,
        }
    }

    pub fn sent(&self) -> Vec<(PushTarget, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, target: &PushTarget, text: &str) -> Delivery {
        self.sent.lock().unwrap().push((target.clone(), text.to_string()));
        self.reply.clone()
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}
