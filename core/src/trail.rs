use crate::{
	curve,
	error::{Error, Result},
	TRAILS_RENDERED,
};
use opencv::{
	core::{self, Mat, Point, Point2d, Scalar, Size, Vector, BORDER_DEFAULT},
	imgproc,
	prelude::*,
};
use rand::Rng;
use std::sync::atomic::Ordering;

const BLUR_KERNEL: Size = Size::new(25, 25);
const BLUR_SIGMA: f64 = 10.0;
const FIT_ATTEMPTS: usize = 4;

pub struct TrailStyle {
	pub color: Scalar,
	pub scale: f64,
}

pub struct StrokeLayer {
	pub thickness: i32,
	pub opacity: f64,
}

pub fn trail_color<R: Rng>(rng: &mut R) -> Scalar {
	Scalar::new(
		f64::from(rng.random_range(10..20)),
		f64::from(rng.random_range(10..20)),
		f64::from(rng.random_range(200..255)),
		0.0,
	)
}

pub fn sample_color_layers<R: Rng>(rng: &mut R) -> Vec<StrokeLayer> {
	(0..rng.random_range(4..6))
		.map(|_| StrokeLayer {
			thickness: rng.random_range(25..35),
			opacity: rng.random_range(0.5..1.0),
		})
		.collect()
}

pub fn sample_highlight_layer<R: Rng>(rng: &mut R) -> StrokeLayer {
	StrokeLayer {
		thickness: rng.random_range(10..13),
		opacity: rng.random_range(0.8..1.0),
	}
}

pub fn render_trails<R: Rng>(
	frame: &mut Mat,
	anchors: &[Point],
	scale: f64,
	rng: &mut R,
) -> Result<()> {
	if anchors.is_empty() {
		return Ok(());
	}
	// One color per batch, so every trail in a pass shares a hue.
	let style = TrailStyle {
		color: trail_color(rng),
		scale,
	};
	for anchor in anchors.iter().copied() {
		render_trail(frame, anchor, &style, rng)?;
	}
	Ok(())
}

pub fn render_trail<R: Rng>(
	frame: &mut Mat,
	anchor: Point,
	style: &TrailStyle,
	rng: &mut R,
) -> Result<()> {
	let size = frame.size()?;
	if anchor.x < 0 || anchor.y < 0 || anchor.x >= size.width || anchor.y >= size.height {
		return Err(Error::AnchorOutOfBounds {
			x: anchor.x,
			y: anchor.y,
			width: size.width,
			height: size.height,
		});
	}

	let fitted = fit_with_retries(rng)?;
	let path = curve::anchor_curve(&fitted, anchor, style.scale);
	let mut polyline = Vector::<Vector<Point>>::new();
	polyline.push(path);

	let mut overlay = Mat::zeros(size.height, size.width, frame.typ())?.to_mat()?;
	for layer in sample_color_layers(rng) {
		overlay = blend_stroke(&overlay, &polyline, style.color, &layer, style.scale)?;
	}

	let mut blurred = Mat::default();
	imgproc::gaussian_blur(
		&overlay,
		&mut blurred,
		BLUR_KERNEL,
		BLUR_SIGMA,
		BLUR_SIGMA,
		BORDER_DEFAULT,
	)?;

	// Unblurred white pass on top reads as a shine along the trail.
	let highlight = sample_highlight_layer(rng);
	let overlay = blend_stroke(
		&blurred,
		&polyline,
		Scalar::new(255.0, 255.0, 255.0, 0.0),
		&highlight,
		style.scale,
	)?;

	composite(frame, &overlay)?;
	TRAILS_RENDERED.fetch_add(1, Ordering::Relaxed);
	Ok(())
}

pub fn composite(frame: &mut Mat, overlay: &Mat) -> Result<()> {
	let frame_size = frame.size()?;
	let overlay_size = overlay.size()?;
	if frame_size != overlay_size || frame.typ() != overlay.typ() {
		return Err(Error::ShapeMismatch {
			overlay: overlay_size,
			frame: frame_size,
		});
	}
	let mut merged = Mat::default();
	core::add_weighted(overlay, 1.0, &*frame, 1.0, 0.0, &mut merged, -1)?;
	*frame = merged;
	Ok(())
}

fn blend_stroke(
	overlay: &Mat,
	polyline: &Vector<Vector<Point>>,
	color: Scalar,
	layer: &StrokeLayer,
	scale: f64,
) -> Result<Mat> {
	let mut stroked = overlay.clone();
	let thickness = ((f64::from(layer.thickness) * scale) as i32).max(1);
	imgproc::polylines(
		&mut stroked,
		polyline,
		false,
		color,
		thickness,
		imgproc::LINE_8,
		0,
	)?;
	let mut blended = Mat::default();
	core::add_weighted(
		&stroked,
		layer.opacity,
		overlay,
		1.0 - layer.opacity,
		0.0,
		&mut blended,
		-1,
	)?;
	Ok(blended)
}

fn fit_with_retries<R: Rng>(rng: &mut R) -> Result<Vec<Point2d>> {
	let mut attempts = 0;
	loop {
		attempts += 1;
		let control = curve::sample_control_points(rng);
		match curve::fit_curve(&control) {
			Ok(fitted) => return Ok(fitted),
			Err(err @ Error::DegenerateCurve { .. }) if attempts < FIT_ATTEMPTS => {
				log::debug!("resampling control points after degenerate fit: {err}");
			}
			Err(err) => return Err(err),
		}
	}
}
