pub(crate) mod chapter;
pub(crate) mod session;
pub(crate) mod tracking;


use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::cli::{Cli, Command};
use crate::db::{COLLECTION_KEY, SessionStore};
use crate::paths::{database_file_path, default_manifest_path};

use self::chapter::{Chapter, format_time, format_updated_display, load_manifest, truncate};
use self::session::Session;
use self::tracking::progress::{DEFAULT_WATCHED_THRESHOLD, chapter_by_id, completion_rate};

pub fn run(cli: Cli) -> Result<()> {
    let manifest_path = cli.manifest.unwrap_or_else(default_manifest_path);
    let seed = load_manifest(&manifest_path)?;
    let store = open_store()?;

    let chapters = store.load_chapters(&seed);
    let cursor = store.load_cursor();
    let threshold = if cli.watched_threshold.is_finite() {
        cli.watched_threshold.clamp(0.0, 100.0)
    } else {
        DEFAULT_WATCHED_THRESHOLD
    };
    let mut session = Session::new(chapters, cursor, threshold);

    match cli.command {
        Some(Command::Play) | None => run_play(&mut session, &store)?,
        Some(Command::Next) => run_next(&mut session, &store)?,
        Some(Command::Goto { position }) => run_goto(&mut session, &store, position)?,
        Some(Command::List) => run_list(&session),
        Some(Command::Stats) => run_stats(&session, &store)?,
        Some(Command::Reset { yes }) => run_reset(&mut session, &store, &seed, yes)?,
    }

    Ok(())
}

fn run_play(session: &mut Session, store: &SessionStore) -> Result<()> {
    let chapter = session.active();
    println!(
        "Playing chapter {} of {}: {}",
        session.active_index + 1,
        session.chapters.len(),
        chapter.title
    );
    if chapter.last_played_time_seconds > 0.0 && !chapter.watched {
        println!("Resuming from {}", format_time(chapter.last_played_time_seconds));
    }

    let outcome = match tracking::playback::run_playback(session, store) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("Playback failed: {err:#}");
            println!("Progress unchanged.");
            return Ok(());
        }
    };

    let chapter = session.active();
    if outcome.completed {
        println!("Finished: {} (100%)", chapter.title);
        if session.select_next() {
            if let Err(err) = store.save_cursor(session.active_index) {
                eprintln!("Warning: {err:#}");
            }
            println!("Up next: {}", session.active().title);
        } else {
            println!("That was the last chapter.");
        }
    } else {
        println!(
            "Stopped at {} ({}%)",
            format_time(chapter.last_played_time_seconds),
            chapter.watched_percentage.round() as i64
        );
    }
    Ok(())
}

fn run_next(session: &mut Session, store: &SessionStore) -> Result<()> {
    if session.select_next() {
        store.save_cursor(session.active_index)?;
        println!(
            "Active chapter is now {} of {}: {}",
            session.active_index + 1,
            session.chapters.len(),
            session.active().title
        );
    } else {
        println!("Already on the last chapter: {}", session.active().title);
    }
    Ok(())
}

fn run_goto(session: &mut Session, store: &SessionStore, position: usize) -> Result<()> {
    let Some(index) = position.checked_sub(1) else {
        println!("Chapter positions start at 1.");
        return Ok(());
    };
    if !session.select(index) {
        println!(
            "No chapter at position {position}; the list has {} chapters.",
            session.chapters.len()
        );
        return Ok(());
    }
    store.save_cursor(session.active_index)?;
    println!("Active chapter is now {position}: {}", session.active().title);
    Ok(())
}

fn run_list(session: &Session) {
    println!("{:<4} {:<40} {:<10} {:<16}", "#", "TITLE", "STATUS", "POSITION");
    for (index, chapter) in session.chapters.iter().enumerate() {
        let marker = if index == session.active_index { "*" } else { " " };
        println!(
            "{marker}{:<3} {:<40} {:<10} {} / {}",
            index + 1,
            truncate(&chapter.title, 40),
            chapter.status_label(),
            format_time(chapter.last_played_time_seconds),
            format_time(chapter.duration_seconds),
        );
    }
}

fn run_stats(session: &Session, store: &SessionStore) -> Result<()> {
    let watched = session
        .chapters
        .iter()
        .filter(|chapter| chapter.watched)
        .count();
    println!("Overall progress");
    println!(
        "  {watched} / {} chapters, {}% complete",
        session.chapters.len(),
        completion_rate(&session.chapters)
    );

    // Cursor and collection are kept consistent, but a missing id must only
    // ever mean "nothing to show".
    if let Some(chapter) = chapter_by_id(&session.chapters, session.active().id) {
        println!("\nCurrent chapter: {}", chapter.title);
        println!(
            "  Status: {}",
            if chapter.watched { "Completed" } else { "In Progress" }
        );
        println!("  Progress: {}%", chapter.watched_percentage.round() as i64);
        println!(
            "  Position: {} / {}",
            format_time(chapter.last_played_time_seconds),
            format_time(chapter.duration_seconds)
        );
    }

    if let Some(updated_at) = store.updated_at(COLLECTION_KEY)? {
        println!("\nLast updated: {}", format_updated_display(&updated_at));
    }
    Ok(())
}

fn run_reset(
    session: &mut Session,
    store: &SessionStore,
    seed: &[Chapter],
    yes: bool,
) -> Result<()> {
    if !yes && !confirm_reset()? {
        println!("Reset cancelled.");
        return Ok(());
    }

    session.reset(seed);
    store.save_chapters(&session.chapters)?;
    store.save_cursor(session.active_index)?;
    println!("All chapter progress discarded.");
    Ok(())
}

fn confirm_reset() -> Result<bool> {
    print!("Reset all chapter progress? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn open_store() -> Result<SessionStore> {
    let db_path = database_file_path()?;
    let store = SessionStore::open(&db_path)?;
    store.migrate()?;
    Ok(store)
}
