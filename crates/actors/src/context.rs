use crate::{
    actor::Actor,
    actor_ref::{ActorRef, WeakActorRef},
};

/// Handed to every handler invocation. Work spawned by a handler reports
/// back through `myself()`.
pub struct Context<A: Actor> {
    myself: WeakActorRef<A>,
}

impl<A: Actor> Context<A> {
    pub(crate) fn new(myself: WeakActorRef<A>) -> Self {
        Self { myself }
    }

    /// `None` once the actor is shutting down.
    pub fn myself(&self) -> Option<ActorRef<A>> {
        self.myself.upgrade()
    }
}
