/// Build channel state of a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildState {
    #[default]
    Idle,
    Building,
    Serving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    /// A `build` or `rebuild` command arrived.
    Command,
    /// The listener of the new cycle is bound.
    Bound,
    /// The cycle failed before it could serve.
    Failed,
}

impl BuildState {
    /// The state after `event`, or `None` if the event is not valid here.
    ///
    /// There is no way back from `Serving` to `Idle`: a worker stops serving
    /// only when its host replaces it.
    pub fn next(self, event: BuildEvent) -> Option<Self> {
        match (self, event) {
            (BuildState::Idle | BuildState::Serving, BuildEvent::Command) => {
                Some(BuildState::Building)
            }
            (BuildState::Building, BuildEvent::Bound) => Some(BuildState::Serving),
            (BuildState::Building, BuildEvent::Failed) => Some(BuildState::Idle),
            _ => None,
        }
    }
}
