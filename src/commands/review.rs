use crate::config::{self, Config};
use crate::parser::segment;
use crate::remote::RemoteStore;
use crate::sync::list_documents;
use eyre::Result;
use std::fs;

const TITLE_WIDTH: usize = 50;

pub fn run(config: &Config, reference: Option<String>) -> Result<()> {
    let (file_name, content) = load_document(config, reference)?;
    let chapters = segment(&content);

    println!("Chapters in \"{file_name}\":\n");
    for (index, chapter) in chapters.iter().enumerate() {
        let title: String = if chapter.title.chars().count() > TITLE_WIDTH {
            let prefix: String = chapter.title.chars().take(TITLE_WIDTH - 3).collect();
            format!("{prefix}...")
        } else {
            chapter.title.clone()
        };
        println!("{:>4}. {title}", index + 1);
    }
    println!("\n{} chapters found.", chapters.len());
    println!("Start reading with `davread look <number>` or `davread look <title>`.");
    Ok(())
}

/// The selected file's cached copy, or a named/numbered file fetched from
/// the share into the cache without changing the selection.
fn load_document(config: &Config, reference: Option<String>) -> Result<(String, String)> {
    if reference.is_none()
        && let Some(selection) = config::read_current_selection()?
        && selection.local_path.exists()
    {
        let content = fs::read_to_string(&selection.local_path)?;
        return Ok((selection.file_name, content));
    }

    let Some(reference) = reference else {
        eyre::bail!("No file selected; run `davread use` or name a file");
    };

    let store = super::store_from(config)?;
    let documents = list_documents(&store, "/")?;
    let Some(document) = super::resolve_entry(&documents, &reference) else {
        eyre::bail!("No file matching \"{reference}\"; see `davread list`");
    };

    let cache = config::cache_dir()?;
    fs::create_dir_all(&cache)?;
    let local_path = cache.join(&document.name);
    if !local_path.exists() {
        let bytes = store.get(&document.path)?;
        fs::write(&local_path, &bytes)?;
    }
    let content = fs::read_to_string(&local_path)?;
    Ok((document.name.clone(), content))
}
