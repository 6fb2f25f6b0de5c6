use anyhow::Result;

use super::player::{PlayerHandle, with_sigint_ignored};
use super::{PlaybackOutcome, PlayerEvent, TrackedEvent};
use crate::app::session::Session;
use crate::db::SessionStore;

/// Plays the active chapter through mpv and streams its events into the
/// session. Every applied change is written through to the store; a failed
/// write is warned about once and playback carries on with the in-memory
/// state authoritative.
pub(crate) fn run_playback(session: &mut Session, store: &SessionStore) -> Result<PlaybackOutcome> {
    let chapter_id = session.active().id;
    let source = session.active().source.clone();
    let generation = session.generation;

    with_sigint_ignored(|| {
        let mut player = PlayerHandle::spawn(&source)?;
        let mut resumed = false;
        let mut save_warned = false;
        let mut outcome = PlaybackOutcome { completed: false };

        while let Some(event) = player.next_event()? {
            let changed = session.apply(TrackedEvent {
                generation,
                chapter_id,
                event,
            });
            if changed && let Err(err) = store.save_chapters(&session.chapters) {
                if !save_warned {
                    eprintln!("Warning: {err:#}; keeping progress in memory");
                    save_warned = true;
                }
            }

            match event {
                PlayerEvent::DurationResolved(_) if !resumed => {
                    resumed = true;
                    // apply() clamped the stored cursor into the reported
                    // duration, so it is safe to seek to.
                    let resume_at = session.active().last_played_time_seconds;
                    if resume_at > 0.0
                        && let Err(err) = player.seek_to(resume_at)
                    {
                        eprintln!("Warning: resume seek failed: {err:#}");
                    }
                    if let Err(err) = player.set_pause(false) {
                        eprintln!("Warning: failed to start playback: {err:#}");
                    }
                }
                PlayerEvent::Ended => {
                    outcome.completed = true;
                }
                _ => {}
            }
        }

        Ok(outcome)
    })
}
