//! Operator approval over a channel.
//!
//! The session thread must block until the operator answers, but the console
//! is owned by the async front-end, which also reads pause/resume/quit
//! commands from the same stdin.  [`ChannelApprover`] bridges the two: each
//! call posts an [`ApprovalRequest`] to the front-end and waits for the reply.
//! A request that is dropped unanswered counts as a denial.

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::application::receiver_session::Approver;

/// A pending "allow this sender?" question.
#[derive(Debug)]
pub struct ApprovalRequest {
    pub pc_name: String,
    reply: oneshot::Sender<bool>,
}

impl ApprovalRequest {
    pub fn answer(self, granted: bool) {
        let _ = self.reply.send(granted);
    }
}

/// [`Approver`] that forwards each request to whoever holds the receiver.
pub struct ChannelApprover {
    requests: mpsc::UnboundedSender<ApprovalRequest>,
}

impl ChannelApprover {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

impl Approver for ChannelApprover {
    /// Must not be called from inside an async context.
    fn approve(&self, pc_name: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = ApprovalRequest {
            pc_name: pc_name.to_string(),
            reply,
        };
        if self.requests.send(request).is_err() {
            warn!("No one is listening for approval requests; denying {pc_name:?}");
            return false;
        }
        answer.blocking_recv().unwrap_or_else(|_| {
            warn!("Approval request for {pc_name:?} dropped unanswered; denying");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_is_returned_to_blocked_caller() {
        // Arrange
        let (approver, mut requests) = ChannelApprover::new();
        let caller = std::thread::spawn(move || approver.approve("laptop"));

        // Act
        let request = requests.blocking_recv().unwrap();
        assert_eq!(request.pc_name, "laptop");
        request.answer(true);

        // Assert
        assert!(caller.join().unwrap());
    }

    #[test]
    fn test_dropped_request_is_denial() {
        let (approver, mut requests) = ChannelApprover::new();
        let caller = std::thread::spawn(move || approver.approve("laptop"));

        drop(requests.blocking_recv().unwrap());

        assert!(!caller.join().unwrap());
    }

    #[test]
    fn test_no_listener_is_denial() {
        let (approver, requests) = ChannelApprover::new();
        drop(requests);

        assert!(!approver.approve("laptop"));
    }
}
