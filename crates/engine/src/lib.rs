use core::fmt;
use std::error;

use actors::{
    actor::{Actor, ActorError},
    mailbox::BoundedMailbox,
};

pub mod config;
pub mod debounce;
pub mod filter;
pub mod handle;
pub mod lifecycle;
pub mod proximity;
pub mod selection;
pub mod snapshot;
pub mod trip;

pub use config::EngineConfig;
pub use filter::VisibilityFilter;
pub use handle::LifecycleRef;
pub use lifecycle::{spawn, LifecycleHandle, RouteLifecycle, Services};
pub use snapshot::{LifecycleSnapshot, ShipmentPhase, ShipmentView, TripView};
pub use trip::{Place, TripRequest};

/// Talking to the lifecycle actor failed. Provider failures never surface
/// here; they only leave the affected shipment in its previous state.
#[derive(Debug)]
pub enum EngineError {
    /// The actor has stopped.
    MailboxClosed,
    /// The actor dropped the request without answering.
    NoAnswer,
}

impl error::Error for EngineError {}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MailboxClosed => write!(f, "route lifecycle is not running"),
            Self::NoAnswer => write!(f, "route lifecycle did not answer"),
        }
    }
}

impl<A: Actor> From<ActorError<A, BoundedMailbox<A>>> for EngineError {
    fn from(why: ActorError<A, BoundedMailbox<A>>) -> Self {
        match why {
            ActorError::SendError(_) => Self::MailboxClosed,
            ActorError::ReceiveAnswerError(_) => Self::NoAnswer,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
