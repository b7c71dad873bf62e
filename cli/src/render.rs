use crate::cmd::RenderArgs;
use cobble_core::{
	opencv::{
		core::Vector,
		imgcodecs::{self, IMREAD_COLOR},
		prelude::*,
	},
	trail,
};
use color_eyre::eyre::{eyre, Result, WrapErr};

pub fn render(args: RenderArgs) -> Result<()> {
	let path = args
		.input
		.to_str()
		.wrap_err("invalid input path cannot be represented as a str")?;
	let mut image = imgcodecs::imread(path, IMREAD_COLOR)
		.wrap_err_with(|| format!("failed to read image from {}", args.input.display()))?;
	if image.empty() {
		return Err(eyre!("no image data at {}", args.input.display()));
	}

	let mut rng = cobble_core::rng_from_seed(args.seed);
	trail::render_trails(&mut image, &args.anchors, args.scale, &mut rng)
		.wrap_err("failed to render trails")?;

	let output = args
		.output
		.to_str()
		.wrap_err("invalid output path cannot be represented as a str")?;
	imgcodecs::imwrite(output, &image, &Vector::new())
		.wrap_err_with(|| format!("failed to write image to {}", args.output.display()))?;
	println!(
		"rendered {} trail(s) into {}",
		args.anchors.len(),
		args.output.display()
	);
	Ok(())
}
