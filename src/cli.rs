use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "davread",
    version,
    about = "Read plain-text novels from a WebDAV share, keeping your place across devices.",
    long_about = None
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configure the WebDAV connection
    Config {
        /// Share URL, e.g. https://dav.example.com/books
        #[clap(long)]
        url: Option<String>,
        #[clap(long)]
        username: Option<String>,
        #[clap(long)]
        password: Option<String>,
        /// Print the current connection values
        #[clap(long)]
        show: bool,
    },

    /// List readable files on the share
    List,

    /// Select a file and cache it locally for reading
    Use {
        /// File name or number from `davread list`
        file: String,
    },

    /// Read the selected file
    Look {
        /// Chapter title or number to start from (defaults to the saved
        /// position)
        chapter: Option<String>,
    },

    /// Print the chapter index of a file
    Review {
        /// File name or number; defaults to the selected file
        file: Option<String>,
    },

    /// Upload a local file to the share
    Upload {
        path: PathBuf,
    },

    /// Delete a file from the share
    Delete {
        /// File name or number from `davread list`
        file: String,
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },

    /// Show or change reading settings and key bindings
    Settings(SettingsArgs),
}

#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Print the active settings
    #[clap(long)]
    pub show: bool,

    /// Pull the settings blob from the share and merge it in
    #[clap(long)]
    pub sync: bool,

    /// Push the local settings blob to the share
    #[clap(long)]
    pub upload: bool,

    #[clap(long, value_name = "N")]
    pub set_lines_per_page: Option<usize>,

    #[clap(long, value_name = "N")]
    pub set_chapters_per_page: Option<usize>,

    #[clap(long, value_name = "BOOL")]
    pub set_clear_on_navigate: Option<bool>,

    /// Comma-separated keys, e.g. "[,up,1"
    #[clap(long, value_name = "KEYS")]
    pub set_prev_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_next_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_exit_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_help_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_chapter_list_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_reset_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_scroll_end_keys: Option<String>,

    #[clap(long, value_name = "KEYS")]
    pub set_privacy_keys: Option<String>,
}

impl SettingsArgs {
    pub fn is_empty(&self) -> bool {
        !self.show
            && !self.sync
            && !self.upload
            && self.set_lines_per_page.is_none()
            && self.set_chapters_per_page.is_none()
            && self.set_clear_on_navigate.is_none()
            && self.set_prev_keys.is_none()
            && self.set_next_keys.is_none()
            && self.set_exit_keys.is_none()
            && self.set_help_keys.is_none()
            && self.set_chapter_list_keys.is_none()
            && self.set_reset_keys.is_none()
            && self.set_scroll_end_keys.is_none()
            && self.set_privacy_keys.is_none()
    }
}
