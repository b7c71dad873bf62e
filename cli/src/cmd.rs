use clap::{Args, Parser, Subcommand};
use cobble_core::opencv::core::Point;
use color_eyre::eyre::{ContextCompat, Result, WrapErr};
use itertools::Itertools;
use std::{path::PathBuf, str::FromStr};

#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct CliArgs {
	#[command(subcommand)]
	pub command: CliSubcommands,
}

#[derive(Subcommand)]
pub enum CliSubcommands {
	Run(RunArgs),
	Render(RenderArgs),
	Annotate(AnnotateArgs),
}

#[derive(Args)]
pub struct RunArgs {
	/// The input video file.
	#[arg(short, long)]
	pub input: PathBuf,
	/// The ONNX detection model. Processing stays unavailable without one.
	#[arg(short, long)]
	pub model: Option<PathBuf>,
	/// Comma-separated class names the model was trained on.
	#[arg(long, value_delimiter = ',', default_value = "cobble")]
	pub labels: Vec<String>,
	/// The initial detection confidence threshold (0-1).
	#[arg(short, long, default_value = "0.5")]
	pub confidence: f64,
	/// The trail scale factor.
	#[arg(short, long, default_value = "0.4")]
	pub scale: f64,
	/// Seed for the trail generator. Uses OS entropy when omitted.
	#[arg(long)]
	pub seed: Option<u64>,
	/// The directory snapshots are written into.
	#[arg(short = 'o', long, default_value = ".")]
	pub snapshots: PathBuf,
}

#[derive(Args)]
pub struct RenderArgs {
	/// The input image file.
	#[arg(short, long)]
	pub input: PathBuf,
	/// The anchor point(s) to center trails on, formatted as x,y.
	#[arg(short, long = "anchor", required = true, num_args = 1.., value_parser = parse_point)]
	pub anchors: Vec<Point>,
	/// The trail scale factor.
	#[arg(short, long, default_value = "0.4")]
	pub scale: f64,
	/// Seed for the trail generator. Uses OS entropy when omitted.
	#[arg(long)]
	pub seed: Option<u64>,
	/// The file to output to.
	#[arg(short, default_value = "render.png")]
	pub output: PathBuf,
}

#[derive(Args)]
pub struct AnnotateArgs {
	/// The input image file.
	#[arg(short, long)]
	pub input: PathBuf,
	/// The ONNX detection model.
	#[arg(short, long)]
	pub model: PathBuf,
	/// Comma-separated class names the model was trained on.
	#[arg(long, value_delimiter = ',', default_value = "cobble")]
	pub labels: Vec<String>,
	/// The detection confidence threshold (0-1).
	#[arg(short, long, default_value = "0.5")]
	pub confidence: f64,
	/// The file to output to.
	#[arg(short, default_value = "annotated.png")]
	pub output: PathBuf,
}

fn parse_point(arg: &str) -> Result<Point> {
	let (x, y) = arg
		.split(',')
		.map(str::trim)
		.map(|coord| {
			i32::from_str(coord).wrap_err_with(|| format!("invalid number '{}'", coord))
		})
		.collect::<Result<Vec<i32>>>()
		.wrap_err("anchor should be formatted as x,y")?
		.into_iter()
		.collect_tuple()
		.context("anchor should be formatted as x,y")?;

	Ok(Point::new(x, y))
}
