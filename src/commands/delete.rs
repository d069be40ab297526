use crate::config::Config;
use crate::remote::RemoteStore;
use crate::state::State;
use crate::sync::list_documents;
use eyre::Result;
use std::io::{self, BufRead, Write};

pub fn run(config: &Config, reference: &str, yes: bool) -> Result<()> {
    let store = super::store_from(config)?;
    let documents = list_documents(&store, "/")?;
    let Some(document) = super::resolve_entry(&documents, reference) else {
        eyre::bail!("No file matching \"{reference}\"; see `davread list`");
    };

    if !yes && !confirm(&format!("Delete {} from the share? [y/N] ", document.name))? {
        println!("Nothing deleted.");
        return Ok(());
    }

    store.delete(&document.path)?;

    // The file is gone; its reading position is just noise now.
    if let Ok(state) = State::new() {
        let _ = state.delete_position(&document.name);
    }

    println!("Deleted {}.", document.name);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}
