use super::super::chapter::Chapter;

pub(crate) const DEFAULT_WATCHED_THRESHOLD: f64 = 95.0;

/// Applies a raw time-position report to the matching chapter. Returns whether
/// anything changed; events with an unknown id or an unusable duration leave
/// the collection untouched so a not-yet-loaded duration can never push
/// NaN/Infinity into stored state.
///
/// `watched` is a one-way latch: crossing the threshold once marks the chapter
/// permanently, and seeking backward afterward does not clear it.
pub(crate) fn on_time_update(
    chapters: &mut [Chapter],
    id: u32,
    current_seconds: f64,
    duration_seconds: f64,
    threshold: f64,
) -> bool {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 || !current_seconds.is_finite() {
        return false;
    }
    let Some(chapter) = chapters.iter_mut().find(|chapter| chapter.id == id) else {
        return false;
    };

    let percentage = (current_seconds / duration_seconds * 100.0).clamp(0.0, 100.0);
    chapter.last_played_time_seconds = current_seconds.clamp(0.0, duration_seconds);
    chapter.watched_percentage = percentage;
    chapter.watched = chapter.watched || percentage >= threshold;
    true
}

/// End-of-media is authoritative regardless of the last time-update, which may
/// lag behind the actual end. Uses the chapter's own stored duration.
pub(crate) fn on_media_end(chapters: &mut [Chapter], id: u32) -> bool {
    let Some(chapter) = chapters.iter_mut().find(|chapter| chapter.id == id) else {
        return false;
    };

    chapter.watched = true;
    chapter.watched_percentage = 100.0;
    chapter.last_played_time_seconds = chapter.duration_seconds;
    true
}

/// Records the duration once the media source first reports it, clamping any
/// previously persisted cursor into range. The persisted position can exceed a
/// newly reported duration when the underlying file changed between sessions.
pub(crate) fn on_duration_resolved(chapters: &mut [Chapter], id: u32, duration_seconds: f64) -> bool {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return false;
    }
    let Some(chapter) = chapters.iter_mut().find(|chapter| chapter.id == id) else {
        return false;
    };

    chapter.duration_seconds = duration_seconds;
    chapter.last_played_time_seconds = chapter
        .last_played_time_seconds
        .clamp(0.0, duration_seconds);
    chapter.watched_percentage =
        (chapter.last_played_time_seconds / duration_seconds * 100.0).clamp(0.0, 100.0);
    true
}

/// Saturating advance; reaching the end of the collection stays on the last
/// chapter, no wraparound.
pub(crate) fn select_next(active_index: usize, len: usize) -> usize {
    if active_index + 1 < len {
        active_index + 1
    } else {
        active_index
    }
}

pub(crate) fn reset_all(seed: &[Chapter]) -> Vec<Chapter> {
    seed.to_vec()
}

pub(crate) fn completion_rate(chapters: &[Chapter]) -> u32 {
    if chapters.is_empty() {
        return 0;
    }
    let watched = chapters.iter().filter(|chapter| chapter.watched).count();
    (watched as f64 / chapters.len() as f64 * 100.0).round() as u32
}

pub(crate) fn chapter_by_id(chapters: &[Chapter], id: u32) -> Option<&Chapter> {
    chapters.iter().find(|chapter| chapter.id == id)
}
