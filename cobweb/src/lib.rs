pub mod commands;
pub mod handlers;

pub use commands::command_argument_builder;
pub use handlers::{
    CheckArgs, EXIT_CLEAN, EXIT_DEAD_LINKS, EXIT_FATAL, exit_code_for, parse_url_line,
    parse_yes_no, prompt_crawl_target, seed_from_input,
};

// Re-export crawl functionality from cobweb-core
pub use cobweb_core::crawl::{CrawlOptions, execute_crawl};
