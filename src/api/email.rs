//! Outbound message dispatch boundary.
//!
//! The core only ever asks for "send a message of kind K to address A with
//! payload P"; delivery transport lives behind the [`MessageSender`] trait.
//! Dispatch is fire-and-forget: a failed send is logged and reported, but it
//! never rolls back the token generation that triggered it, since the owner
//! can always request a fresh token.

use anyhow::Result;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Verification,
    PasswordReset,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

#[derive(Clone, Debug)]
pub struct OutboundMessage {
    pub to: String,
    pub kind: MessageKind,
    pub payload: serde_json::Value,
}

pub trait MessageSender: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    /// Returns an error when delivery fails; callers treat this as
    /// advisory.
    fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// Sender that logs instead of delivering; the transport is out of scope.
#[derive(Clone, Debug)]
pub struct LogMessageSender;

impl MessageSender for LogMessageSender {
    fn send(&self, message: &OutboundMessage) -> Result<()> {
        info!(
            to = %message.to,
            kind = message.kind.as_str(),
            payload = %message.payload,
            "outbound message"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatch: failures are logged, never propagated.
pub fn dispatch(sender: &dyn MessageSender, message: &OutboundMessage) {
    if let Err(err) = sender.send(message) {
        error!(
            to = %message.to,
            kind = message.kind.as_str(),
            "failed to dispatch message: {err}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<OutboundMessage>>,
        fail: bool,
    }

    impl MessageSender for RecordingSender {
        fn send(&self, message: &OutboundMessage) -> Result<()> {
            if self.fail {
                anyhow::bail!("transport down");
            }
            match self.sent.lock() {
                Ok(mut sent) => sent.push(message.clone()),
                Err(poisoned) => poisoned.into_inner().push(message.clone()),
            }
            Ok(())
        }
    }

    #[test]
    fn dispatch_delivers_through_the_sender() {
        let sender = RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail: false,
        };
        let message = OutboundMessage {
            to: "fan@example.com".to_string(),
            kind: MessageKind::Verification,
            payload: json!({"verify_url": "https://clef.dev/verify-email#token=t"}),
        };
        dispatch(&sender, &message);
        let sent = sender.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, MessageKind::Verification);
    }

    #[test]
    fn dispatch_swallows_transport_failures() {
        let sender = RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail: true,
        };
        let message = OutboundMessage {
            to: "fan@example.com".to_string(),
            kind: MessageKind::PasswordReset,
            payload: json!({}),
        };
        // Must not panic or propagate.
        dispatch(&sender, &message);
    }

    #[test]
    fn log_sender_accepts_messages() {
        let message = OutboundMessage {
            to: "fan@example.com".to_string(),
            kind: MessageKind::Verification,
            payload: json!({"email": "fan@example.com"}),
        };
        assert!(LogMessageSender.send(&message).is_ok());
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(MessageKind::Verification.as_str(), "verification");
        assert_eq!(MessageKind::PasswordReset.as_str(), "password_reset");
    }
}
