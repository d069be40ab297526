use crate::cli::SettingsArgs;
use crate::config::Config;
use crate::models::Action;
use crate::settings::KeyBindings;
use crate::sync::{fetch_remote_settings, upload_settings};
use chrono::Utc;
use eyre::Result;

pub fn run(config: &mut Config, args: &SettingsArgs) -> Result<()> {
    if args.is_empty() {
        show(config);
        return Ok(());
    }
    if args.show {
        show(config);
    }

    let mut changed = false;

    if let Some(lines) = args.set_lines_per_page {
        if !(10..=100).contains(&lines) {
            eyre::bail!("Lines per page must be between 10 and 100");
        }
        config.reading.lines_per_page = lines;
        println!("Lines per page set to {lines}.");
        changed = true;
    }

    if let Some(chapters) = args.set_chapters_per_page {
        if !(5..=100).contains(&chapters) {
            eyre::bail!("Chapters per page must be between 5 and 100");
        }
        config.reading.chapters_per_page = chapters;
        println!("Chapters per page set to {chapters}.");
        changed = true;
    }

    if let Some(clear) = args.set_clear_on_navigate {
        config.reading.clear_on_navigate = clear;
        println!(
            "Screen will {}be cleared on navigation.",
            if clear { "" } else { "not " }
        );
        changed = true;
    }

    let key_updates: [(&Option<String>, &mut Option<Vec<String>>, &str); 8] = [
        (&args.set_prev_keys, &mut config.key_bindings.previous_chapter, "previous chapter"),
        (&args.set_next_keys, &mut config.key_bindings.next_chapter, "next chapter"),
        (&args.set_exit_keys, &mut config.key_bindings.exit, "exit"),
        (&args.set_help_keys, &mut config.key_bindings.help, "help"),
        (&args.set_chapter_list_keys, &mut config.key_bindings.chapter_list, "chapter list"),
        (&args.set_reset_keys, &mut config.key_bindings.reset_position, "reset position"),
        (&args.set_scroll_end_keys, &mut config.key_bindings.scroll_to_end, "scroll to end"),
        (&args.set_privacy_keys, &mut config.key_bindings.privacy_toggle, "privacy toggle"),
    ];
    for (input, slot, label) in key_updates {
        if let Some(raw) = input {
            let keys = parse_key_list(raw)?;
            println!("Keys for {label} set to: {}", keys.join(", "));
            *slot = Some(keys);
            changed = true;
        }
    }

    if changed {
        config.save()?;
    }

    if args.sync {
        let store = super::store_from(config)?;
        match fetch_remote_settings(&store) {
            Some(blob) => {
                config.reading.merge(blob.reading);
                config.key_bindings.apply(&blob.key_bindings);
                config.last_sync = Some(Utc::now());
                config.save()?;
                println!("Settings synced from the share.");
                show(config);
            }
            None => println!("No settings blob on the share; keeping local settings."),
        }
    }

    if args.upload {
        let store = super::store_from(config)?;
        upload_settings(&store, config)?;
        config.last_sync = Some(Utc::now());
        config.save()?;
        println!("Settings uploaded to the share.");
    }

    Ok(())
}

fn parse_key_list(raw: &str) -> Result<Vec<String>> {
    let keys: Vec<String> = raw
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        eyre::bail!("Key list cannot be empty");
    }
    Ok(keys)
}

fn show(config: &Config) {
    println!("Reading settings:");
    println!("  lines per page:    {}", config.reading.lines_per_page);
    println!("  chapters per page: {}", config.reading.chapters_per_page);
    println!("  clear on navigate: {}", config.reading.clear_on_navigate);

    let table = KeyBindings::merged(&config.key_bindings);
    println!("Key bindings:");
    for action in Action::PRIORITY {
        println!(
            "  {:<14} {}",
            action.label(),
            table.tokens_for(action).join(", ")
        );
    }

    match config.last_sync {
        Some(at) => println!("Last settings sync: {}", at.to_rfc3339()),
        None => println!("Settings never synced."),
    }
}
