mod analytics;
mod cli;
mod csv_import;
mod db;
mod dedup;
mod error;
mod fmt;
mod ingest;
mod models;
mod registry;
mod settings;
mod store;

use clap::Parser;
use colored::Colorize;

use cli::{CardsCommands, CategoriesCommands, Cli, Commands, ReportCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file } => cli::import::run_csv(&file),
        Commands::Ingest { file } => cli::import::run_json(&file),
        Commands::Report { command } => match command {
            ReportCommands::Latest { no_mark, card } => cli::report::latest(no_mark, &card),
            ReportCommands::Daily { date, card } => cli::parse_date_opt(&date)
                .and_then(|(y, m, d)| cli::report::daily(y, m, d, &card)),
            ReportCommands::Monthly { month, top } => {
                cli::parse_month_opt(&month).and_then(|(y, m)| cli::report::monthly(y, m, top))
            }
        },
        Commands::Cards { command } => match command {
            CardsCommands::List => cli::cards::list(),
            CardsCommands::Nickname { card, name } => cli::cards::nickname(&card, &name),
            CardsCommands::Remove { card } => cli::cards::remove(&card),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Create { name } => cli::categories::create(&name),
            CategoriesCommands::Delete { name } => cli::categories::delete(&name),
            CategoriesCommands::Assign { card, category } => {
                cli::categories::assign(&card, &category)
            }
            CategoriesCommands::Unassign { card, category } => {
                cli::categories::unassign(&card, &category)
            }
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }
}
