use davread::{
    cli::{Cli, Command},
    commands,
    config::Config,
    logging,
};

use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_from_verbosity(cli.verbose);

    let mut config = Config::load()?;

    match cli.command {
        Command::Config {
            url,
            username,
            password,
            show,
        } => commands::config::run(&mut config, url, username, password, show),
        Command::List => commands::list::run(&config),
        Command::Use { file } => commands::use_file::run(&config, &file),
        Command::Look { chapter } => commands::look::run(&config, chapter),
        Command::Review { file } => commands::review::run(&config, file),
        Command::Upload { path } => commands::upload::run(&config, &path),
        Command::Delete { file, yes } => commands::delete::run(&config, &file, yes),
        Command::Settings(args) => commands::settings::run(&mut config, &args),
    }
}
