//! Provides the main entry point to the program.
use anyhow::Result;
use clap::Parser;
use geolens::cli::{
    Cli, Commands, ConfigSubcommands, DemoSubcommands, handle_config_generate_command,
    handle_demo_list_command, handle_demo_run_command, handle_run_command,
};

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { analysis_dir } => handle_run_command(&analysis_dir),
        Commands::Demo { subcommand } => match subcommand {
            DemoSubcommands::List => handle_demo_list_command(),
            DemoSubcommands::Run { name } => handle_demo_run_command(&name),
        },
        Commands::Config { subcommand } => match subcommand {
            ConfigSubcommands::Generate => handle_config_generate_command(),
        },
    }
}
