//! Call lifecycle state machine.
//!
//! The machine is pure: [`CallState::advance`] maps a state and an event to
//! the next state and performs no I/O. Re-polling the certificate endpoint,
//! retrying transports, and deciding when to give up all belong to the
//! caller's loop. [`PollBudget`] expresses the caller-imposed bound on poll
//! attempts.

use canlink_cert::{RejectCode, RequestStatus};
use canlink_core::Sha256Hash;

use crate::error::AgentError;

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    /// Unsigned content constructed, nothing computed yet.
    Built,
    /// Request id and signable digest computed, awaiting a signature.
    HashAvailable { request_id: Sha256Hash },
    /// External signature attached, ready to submit.
    Signed { request_id: Sha256Hash },
    /// Submitted to the network, no status observed yet.
    Sent { request_id: Sha256Hash },
    /// The network acknowledged receipt.
    Received { request_id: Sha256Hash },
    /// The call is executing.
    Processing { request_id: Sha256Hash },
    /// Terminal: the call completed with an encoded reply.
    Replied { arg: Vec<u8> },
    /// Terminal: the call was rejected.
    Rejected {
        code: RejectCode,
        message: Option<String>,
    },
    /// Terminal: the status was recorded and later purged.
    Done,
}

/// An input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// The request id (and thus the signable digest) was computed.
    HashComputed(Sha256Hash),
    /// The external signer returned a signature.
    SignatureAttached,
    /// The envelope was handed to the transport.
    Submitted,
    /// A certificate lookup produced a status.
    StatusObserved(RequestStatus),
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Replied { .. } | Self::Rejected { .. } | Self::Done)
    }

    /// The single transition function.
    ///
    /// Events that do not apply to the current state leave it unchanged; in
    /// particular an `Unknown` status keeps the machine where it is so the
    /// caller re-polls.
    pub fn advance(self, event: CallEvent) -> CallState {
        let next = match (self, event) {
            (Self::Built, CallEvent::HashComputed(request_id)) => {
                Self::HashAvailable { request_id }
            }
            (Self::HashAvailable { request_id }, CallEvent::SignatureAttached) => {
                Self::Signed { request_id }
            }
            (Self::Signed { request_id }, CallEvent::Submitted) => Self::Sent { request_id },
            (
                state @ (Self::Sent { .. } | Self::Received { .. } | Self::Processing { .. }),
                CallEvent::StatusObserved(status),
            ) => {
                let request_id = match &state {
                    Self::Sent { request_id }
                    | Self::Received { request_id }
                    | Self::Processing { request_id } => *request_id,
                    _ => unreachable!(),
                };
                match status {
                    RequestStatus::Unknown => state,
                    RequestStatus::Received => Self::Received { request_id },
                    RequestStatus::Processing => Self::Processing { request_id },
                    RequestStatus::Replied(arg) => Self::Replied { arg },
                    RequestStatus::Rejected { code, message } => Self::Rejected { code, message },
                    RequestStatus::Done => Self::Done,
                }
            }
            (state, event) => {
                tracing::debug!(?state, ?event, "ignoring event in current state");
                return state;
            }
        };
        tracing::debug!(?next, "call state advanced");
        next
    }
}

/// Caller-imposed bound on the number of poll attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    limit: u32,
    used: u32,
}

impl PollBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Consume one attempt, failing once the budget is spent.
    pub fn spend(&mut self) -> Result<(), AgentError> {
        if self.used >= self.limit {
            return Err(AgentError::PollBudgetExhausted(self.limit));
        }
        self.used += 1;
        Ok(())
    }

    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Sha256Hash {
        Sha256Hash::hash(b"request")
    }

    #[test]
    fn test_happy_path_to_replied() {
        let state = CallState::Built
            .advance(CallEvent::HashComputed(id()))
            .advance(CallEvent::SignatureAttached)
            .advance(CallEvent::Submitted)
            .advance(CallEvent::StatusObserved(RequestStatus::Received))
            .advance(CallEvent::StatusObserved(RequestStatus::Processing))
            .advance(CallEvent::StatusObserved(RequestStatus::Replied(
                b"ok".to_vec(),
            )));
        assert_eq!(state, CallState::Replied { arg: b"ok".to_vec() });
        assert!(state.is_terminal());
    }

    #[test]
    fn test_rejected_is_terminal() {
        let state = CallState::Sent { request_id: id() }.advance(CallEvent::StatusObserved(
            RequestStatus::Rejected {
                code: RejectCode::CanisterReject,
                message: None,
            },
        ));
        assert!(state.is_terminal());
        // Further observations are ignored.
        let stuck = state
            .clone()
            .advance(CallEvent::StatusObserved(RequestStatus::Processing));
        assert_eq!(stuck, state);
    }

    #[test]
    fn test_unknown_status_keeps_polling_state() {
        let state = CallState::Processing { request_id: id() }
            .advance(CallEvent::StatusObserved(RequestStatus::Unknown));
        assert_eq!(state, CallState::Processing { request_id: id() });
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        let state = CallState::Built.advance(CallEvent::Submitted);
        assert_eq!(state, CallState::Built);
        let state = CallState::HashAvailable { request_id: id() }
            .advance(CallEvent::StatusObserved(RequestStatus::Received));
        assert_eq!(state, CallState::HashAvailable { request_id: id() });
    }

    #[test]
    fn test_done_after_purge() {
        let state = CallState::Received { request_id: id() }
            .advance(CallEvent::StatusObserved(RequestStatus::Done));
        assert_eq!(state, CallState::Done);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_poll_budget_runs_out() {
        let mut budget = PollBudget::new(2);
        assert!(budget.spend().is_ok());
        assert_eq!(budget.remaining(), 1);
        assert!(budget.spend().is_ok());
        assert!(matches!(
            budget.spend().unwrap_err(),
            AgentError::PollBudgetExhausted(2)
        ));
    }
}
