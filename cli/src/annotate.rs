use crate::cmd::AnnotateArgs;
use cobble_core::{
	detect::{self, OnnxDetector},
	opencv::{
		core::Vector,
		imgcodecs::{self, IMREAD_COLOR},
		prelude::*,
	},
};
use color_eyre::eyre::{eyre, Result, WrapErr};

pub fn annotate(args: AnnotateArgs) -> Result<()> {
	let path = args
		.input
		.to_str()
		.wrap_err("invalid input path cannot be represented as a str")?;
	let mut image = imgcodecs::imread(path, IMREAD_COLOR)
		.wrap_err_with(|| format!("failed to read image from {}", args.input.display()))?;
	if image.empty() {
		return Err(eyre!("no image data at {}", args.input.display()));
	}

	let mut detector = OnnxDetector::load(&args.model, args.labels.clone())?;
	let detections = detector
		.detect(&image, args.confidence as f32)
		.wrap_err("failed to run detection")?;
	detect::draw_detections(&mut image, &detections, &args.labels)
		.wrap_err("failed to draw detections")?;

	let output = args
		.output
		.to_str()
		.wrap_err("invalid output path cannot be represented as a str")?;
	imgcodecs::imwrite(output, &image, &Vector::new())
		.wrap_err_with(|| format!("failed to write image to {}", args.output.display()))?;
	println!(
		"found {} detection(s), wrote {}",
		detections.len(),
		args.output.display()
	);
	Ok(())
}
