use crate::config::{self, Config};
use crate::logging;
use crate::models::ReadingPosition;
use crate::parser::{locate_chapter, segment};
use crate::settings::KeyBindings;
use crate::state::State;
use crate::sync::sync_progress;
use crate::ui::session::{PersistFn, ReadingSession, RenderOptions};
use eyre::Result;
use std::fs;

pub fn run(config: &Config, chapter: Option<String>) -> Result<()> {
    let Some(selection) = config::read_current_selection()? else {
        eyre::bail!("No file selected; run `davread use` first");
    };
    if !selection.local_path.exists() {
        eyre::bail!(
            "Cached copy of {} is missing; run `davread use` again",
            selection.file_name
        );
    }

    let content = fs::read_to_string(&selection.local_path)?;
    let chapters = segment(&content);
    let state = State::new()?;

    let start_index = match &chapter {
        Some(reference) => resolve_start(&chapters, reference)?,
        None => saved_start(&state, &selection.file_name, &chapters)?,
    };
    if chapter.is_none() && start_index > 0 {
        println!("Resuming at chapter {}.", start_index + 1);
    }

    // The save worker gets its own connection; this one stays with the
    // command for the final sync.
    let worker_state = State::new()?;
    let persist: PersistFn = Box::new(move |position: &ReadingPosition| {
        worker_state.upsert_position(position)?;
        Ok(())
    });

    let mut session = ReadingSession::new(
        selection.file_name.clone(),
        chapters,
        start_index,
        persist,
        KeyBindings::merged(&config.key_bindings),
        RenderOptions::from(&config.reading),
        std::io::stdout(),
    );
    let outcome = session.start()?;

    println!(
        "Position saved: {} (chapter {}).",
        outcome.chapter_title,
        outcome.chapter_index + 1
    );

    // Push progress to the share; reading worked, so a sync failure only
    // warrants a warning.
    match super::store_from(config) {
        Ok(store) => match sync_progress(&store, &state) {
            Ok(_) => println!("Progress synced to the share."),
            Err(err) => logging::warn(format!("progress sync failed: {err}")),
        },
        Err(err) => logging::warn(format!("progress kept locally: {err}")),
    }

    Ok(())
}

fn resolve_start(chapters: &[crate::models::Chapter], reference: &str) -> Result<usize> {
    if let Ok(number) = reference.parse::<usize>() {
        if number >= 1 && number <= chapters.len() {
            return Ok(number - 1);
        }
        eyre::bail!("Invalid chapter number: {reference} (1..={})", chapters.len());
    }
    locate_chapter(chapters, reference)
        .ok_or_else(|| eyre::eyre!("No chapter matching \"{reference}\""))
}

/// Start where the last session left off: match the stored title first,
/// fall back to the stored index, else the beginning.
fn saved_start(state: &State, file_name: &str, chapters: &[crate::models::Chapter]) -> Result<usize> {
    let Some(position) = state.get_position(file_name)? else {
        return Ok(0);
    };
    if let Some(index) = locate_chapter(chapters, &position.chapter_title) {
        return Ok(index);
    }
    Ok(position.chapter_index.min(chapters.len().saturating_sub(1)))
}
