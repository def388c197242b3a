//! Element states and the transitions between them.

use std::fmt;

/// Activation level of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum State {
    /// No resources allocated.
    #[default]
    Null,
    /// Library-wide resources allocated.
    Ready,
    /// Stream resources allocated; buffers may flow.
    Paused,
    /// Same resources as `Paused`, clock running.
    Playing,
}

impl State {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            State::Null => "NULL",
            State::Ready => "READY",
            State::Paused => "PAUSED",
            State::Playing => "PLAYING",
        }
    }

    /// Whether the data path may run in this state.
    #[must_use]
    pub fn is_streaming(self) -> bool {
        self >= State::Paused
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single step between adjacent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChange {
    NullToReady,
    ReadyToPaused,
    PausedToPlaying,
    PlayingToPaused,
    PausedToReady,
    ReadyToNull,
}

impl StateChange {
    /// The transition from `current` to `next`, if they are adjacent.
    #[must_use]
    pub fn between(current: State, next: State) -> Option<Self> {
        match (current, next) {
            (State::Null, State::Ready) => Some(StateChange::NullToReady),
            (State::Ready, State::Paused) => Some(StateChange::ReadyToPaused),
            (State::Paused, State::Playing) => Some(StateChange::PausedToPlaying),
            (State::Playing, State::Paused) => Some(StateChange::PlayingToPaused),
            (State::Paused, State::Ready) => Some(StateChange::PausedToReady),
            (State::Ready, State::Null) => Some(StateChange::ReadyToNull),
            _ => None,
        }
    }

    /// Next single step from `current` towards `target`.
    #[must_use]
    pub fn towards(current: State, target: State) -> Option<Self> {
        let next = match current.cmp(&target) {
            std::cmp::Ordering::Less => match current {
                State::Null => State::Ready,
                State::Ready => State::Paused,
                _ => State::Playing,
            },
            std::cmp::Ordering::Greater => match current {
                State::Playing => State::Paused,
                State::Paused => State::Ready,
                _ => State::Null,
            },
            std::cmp::Ordering::Equal => return None,
        };
        Self::between(current, next)
    }

    #[must_use]
    pub fn current(self) -> State {
        match self {
            StateChange::NullToReady => State::Null,
            StateChange::ReadyToPaused | StateChange::ReadyToNull => State::Ready,
            StateChange::PausedToPlaying | StateChange::PausedToReady => State::Paused,
            StateChange::PlayingToPaused => State::Playing,
        }
    }

    #[must_use]
    pub fn next(self) -> State {
        match self {
            StateChange::ReadyToNull => State::Null,
            StateChange::NullToReady | StateChange::PausedToReady => State::Ready,
            StateChange::ReadyToPaused | StateChange::PlayingToPaused => State::Paused,
            StateChange::PausedToPlaying => State::Playing,
        }
    }

    /// Upward transitions acquire resources, downward ones release them.
    #[must_use]
    pub fn is_upward(self) -> bool {
        self.next() > self.current()
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_TO_{}", self.current(), self.next())
    }
}
