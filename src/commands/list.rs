use crate::config::Config;
use crate::state::State;
use crate::sync::list_documents;
use eyre::Result;

pub fn run(config: &Config) -> Result<()> {
    let store = super::store_from(config)?;
    let documents = list_documents(&store, "/")?;

    if documents.is_empty() {
        println!("No files on the share.");
        return Ok(());
    }

    let state = State::new()?;
    println!("{:>3}  {:<40} {:>9}  {}", "#", "name", "size", "last read");
    for (index, document) in documents.iter().enumerate() {
        let progress = state
            .get_position(&document.name)?
            .map(|p| p.chapter_title)
            .unwrap_or_default();
        println!(
            "{:>3}  {:<40} {:>9}  {}",
            index + 1,
            document.name,
            human_size(document.size),
            progress
        );
    }
    println!("\nUse `davread use <name-or-number>` to pick a file.");
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
