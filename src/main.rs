mod cmd;
mod tax;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "taxmaster",
    version,
    about = "Apply category tax rates to a sales file and report the totals"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate tax for every sale and display the report
    Report(cmd::report::ReportCommand),
    /// Check a sales file for records that cannot be taxed
    Validate(cmd::validate::ValidateCommand),
    /// Show the active tax rate table
    Rates(cmd::rates::RatesCommand),
    /// Print the expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Rates(rates) => rates.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
