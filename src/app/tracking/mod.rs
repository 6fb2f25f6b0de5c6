pub(crate) mod playback;
pub(crate) mod player;
pub(crate) mod progress;

/// Notification from the media source, already stripped down to what the
/// tracker cares about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlayerEvent {
    /// The source reported a finite duration for the first time.
    DurationResolved(f64),
    /// Playback cursor moved (includes seeks, so time is not monotone).
    TimeUpdate(f64),
    /// The media ran to its natural end.
    Ended,
    /// The player went away without finishing (quit, stop, load error).
    Closed,
}

/// A player event tagged with the chapter it targets and the collection
/// generation it was issued under. Events from before a reset carry a stale
/// generation and are discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TrackedEvent {
    pub(crate) generation: u64,
    pub(crate) chapter_id: u32,
    pub(crate) event: PlayerEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlaybackOutcome {
    /// Chapter ran to its natural end (as opposed to the user quitting mpv).
    pub(crate) completed: bool,
}
