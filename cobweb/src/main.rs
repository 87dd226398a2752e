use cobweb::command_argument_builder;
use cobweb::handlers::{EXIT_FATAL, handle_check, init_tracing, print_banner};
use colored::Colorize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let chosen_command = command_argument_builder().get_matches();
    let quiet = chosen_command.get_flag("quiet");
    init_tracing(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("check", primary_command)) => match handle_check(primary_command, quiet).await {
            Ok(code) => ExitCode::from(code),
            Err(e) => {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                ExitCode::from(EXIT_FATAL)
            }
        },
        // No subcommand provided, just show the banner
        None => ExitCode::SUCCESS,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
