pub mod annotate;
pub mod cmd;
pub mod render;
pub mod run;

use self::cmd::{CliArgs, CliSubcommands};
use clap::Parser;
use color_eyre::eyre::Result;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> Result<()> {
	color_eyre::install()?;
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = CliArgs::parse();
	match args.command {
		CliSubcommands::Run(args) => run::run(args),
		CliSubcommands::Render(args) => render::render(args),
		CliSubcommands::Annotate(args) => annotate::annotate(args),
	}
}
