use super::chapter::Chapter;
use super::tracking::{PlayerEvent, TrackedEvent};
use super::tracking::progress::{
    on_duration_resolved, on_media_end, on_time_update, reset_all, select_next,
};

/// The authoritative in-memory state: the chapter collection, the navigation
/// cursor, and a generation counter bumped on every full reset.
///
/// All mutation goes through [`Session::apply`] (single-writer: one event is
/// processed to completion before the next), so an event issued against a
/// collection that has since been reset can be recognized and dropped.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Session {
    pub(crate) chapters: Vec<Chapter>,
    pub(crate) active_index: usize,
    pub(crate) generation: u64,
    pub(crate) watched_threshold: f64,
}

impl Session {
    /// Invariant: `chapters` is non-empty and `active_index` in bounds. The
    /// cursor is clamped rather than rejected since a persisted cursor can
    /// outlive a shrunken manifest.
    pub(crate) fn new(chapters: Vec<Chapter>, active_index: usize, watched_threshold: f64) -> Self {
        debug_assert!(!chapters.is_empty());
        let active_index = active_index.min(chapters.len().saturating_sub(1));
        Self {
            chapters,
            active_index,
            generation: 0,
            watched_threshold,
        }
    }

    pub(crate) fn active(&self) -> &Chapter {
        &self.chapters[self.active_index]
    }

    /// Applies one tracked event. Returns whether the collection changed;
    /// stale-generation and invalid events are discarded without effect.
    pub(crate) fn apply(&mut self, tracked: TrackedEvent) -> bool {
        if tracked.generation != self.generation {
            return false;
        }

        match tracked.event {
            PlayerEvent::DurationResolved(duration) => {
                on_duration_resolved(&mut self.chapters, tracked.chapter_id, duration)
            }
            PlayerEvent::TimeUpdate(current) => {
                let duration = self
                    .chapters
                    .iter()
                    .find(|chapter| chapter.id == tracked.chapter_id)
                    .map(|chapter| chapter.duration_seconds)
                    .unwrap_or(0.0);
                on_time_update(
                    &mut self.chapters,
                    tracked.chapter_id,
                    current,
                    duration,
                    self.watched_threshold,
                )
            }
            PlayerEvent::Ended => on_media_end(&mut self.chapters, tracked.chapter_id),
            PlayerEvent::Closed => false,
        }
    }

    /// Advances the cursor, saturating at the last chapter. Returns whether it
    /// moved.
    pub(crate) fn select_next(&mut self) -> bool {
        let next = select_next(self.active_index, self.chapters.len());
        let moved = next != self.active_index;
        self.active_index = next;
        moved
    }

    /// Moves the cursor to a 0-based index; out-of-bounds is rejected.
    pub(crate) fn select(&mut self, index: usize) -> bool {
        if index >= self.chapters.len() {
            return false;
        }
        self.active_index = index;
        true
    }

    /// Replaces the collection with a fresh copy of the seed and bumps the
    /// generation so in-flight events for the old collection are dropped.
    pub(crate) fn reset(&mut self, seed: &[Chapter]) {
        self.chapters = reset_all(seed);
        self.active_index = 0;
        self.generation += 1;
    }
}
