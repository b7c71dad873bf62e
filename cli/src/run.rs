use crate::cmd::RunArgs;
use cobble_core::{
	detect::{Detector, OnnxDetector},
	opencv::{
		core::{Mat, Point, Scalar, Size, Vector},
		highgui, imgcodecs, imgproc,
		prelude::*,
		videoio::{VideoCapture, CAP_ANY, CAP_PROP_POS_FRAMES},
	},
	trail, TRAILS_RENDERED,
};
use color_eyre::eyre::{eyre, Result, WrapErr};
use log::info;
use parking_lot::Mutex;
use std::sync::{atomic::Ordering, Arc};

const WINDOW: &str = "Cobble Viewer";
const CONFIDENCE_TRACKBAR: &str = "Confidence %";
const DISPLAY_SIZE: Size = Size::new(800, 550);

struct AppState {
	generating: bool,
	processing: bool,
	snapshots: usize,
	retained: Mat,
}

pub fn run(args: RunArgs) -> Result<()> {
	let path = args
		.input
		.to_str()
		.wrap_err("invalid input path cannot be represented as a str")?;
	let mut capture = VideoCapture::from_file(path, CAP_ANY)
		.wrap_err_with(|| format!("failed to read video from {}", args.input.display()))?;
	if !capture
		.is_opened()
		.wrap_err("failed to query video capture state")?
	{
		return Err(eyre!("cannot open video at {}", args.input.display()));
	}

	// The first frame pins the source resolution used for click mapping.
	let mut frame = Mat::default();
	if !capture.read(&mut frame).wrap_err("failed to read first frame")? || frame.empty() {
		return Err(eyre!("video at {} contains no frames", args.input.display()));
	}
	let source = frame.size()?;
	capture
		.set(CAP_PROP_POS_FRAMES, 0.0)
		.wrap_err("failed to rewind video")?;
	info!(
		"opened {} ({}x{})",
		args.input.display(),
		source.width,
		source.height
	);

	highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)
		.wrap_err("failed to create viewer window")?;
	highgui::create_trackbar(CONFIDENCE_TRACKBAR, WINDOW, None, 100, None)
		.wrap_err("failed to create confidence trackbar")?;
	highgui::set_trackbar_min(CONFIDENCE_TRACKBAR, WINDOW, 10)?;
	highgui::set_trackbar_pos(CONFIDENCE_TRACKBAR, WINDOW, (args.confidence * 100.0) as i32)?;

	let anchors = Arc::new(Mutex::new(Vec::<Point>::new()));
	let click_anchors = anchors.clone();
	let scale_x = f64::from(source.width) / f64::from(DISPLAY_SIZE.width);
	let scale_y = f64::from(source.height) / f64::from(DISPLAY_SIZE.height);
	highgui::set_mouse_callback(
		WINDOW,
		Some(Box::new(move |event, x, y, _flags| {
			if event == highgui::EVENT_LBUTTONDOWN {
				let anchor = Point::new(
					(f64::from(x) * scale_x) as i32,
					(f64::from(y) * scale_y) as i32,
				);
				click_anchors.lock().push(anchor);
			}
		})),
	)
	.wrap_err("failed to attach mouse callback")?;

	let mut detector: Option<Box<dyn Detector>> = match &args.model {
		Some(model) => Some(Box::new(OnnxDetector::load(model, args.labels.clone())?)),
		None => None,
	};

	let mut rng = cobble_core::rng_from_seed(args.seed);
	let mut state = AppState {
		generating: false,
		processing: false,
		snapshots: 0,
		retained: Mat::default(),
	};

	loop {
		if !capture
			.read(&mut frame)
			.wrap_err("failed to read frame from video")?
			|| frame.empty()
		{
			// End of stream, loop the video.
			capture
				.set(CAP_PROP_POS_FRAMES, 0.0)
				.wrap_err("failed to rewind video")?;
			continue;
		}

		if state.generating {
			let anchors = anchors.lock().clone();
			trail::render_trails(&mut frame, &anchors, args.scale, &mut rng)
				.wrap_err("failed to render trails onto frame")?;
		}

		let confidence =
			f64::from(highgui::get_trackbar_pos(CONFIDENCE_TRACKBAR, WINDOW)?) / 100.0;
		if state.processing {
			imgproc::put_text(
				&mut frame,
				&format!("Threshold: {confidence:.2}"),
				Point::new(30, 60),
				imgproc::FONT_HERSHEY_DUPLEX,
				2.0,
				Scalar::new(255.0, 0.0, 0.0, 0.0),
				3,
				imgproc::LINE_8,
				false,
			)?;
			if let Some(detector) = detector.as_deref_mut() {
				frame = detector
					.annotate(&frame, confidence as f32)
					.wrap_err("failed to annotate frame")?;
			}
		}

		// Keep the full-resolution result around for snapshots.
		state.retained = frame.clone();

		let mut display = Mat::default();
		imgproc::resize(
			&frame,
			&mut display,
			DISPLAY_SIZE,
			0.0,
			0.0,
			imgproc::INTER_LINEAR,
		)?;
		highgui::imshow(WINDOW, &display)?;

		match highgui::wait_key(30)? {
			key if key == 27 || key == i32::from(b'q') => break,
			key if key == i32::from(b'g') => state.generating = !state.generating,
			key if key == i32::from(b'p') => {
				if detector.is_none() {
					println!("no detection model loaded, pass --model to enable processing");
				} else {
					state.processing = !state.processing;
				}
			}
			key if key == i32::from(b'c') => clear_anchors(&anchors),
			key if key == i32::from(b's') => save_snapshot(&mut state, &args)?,
			_ => {}
		}
	}

	println!(
		"rendered {} trail(s) this session",
		TRAILS_RENDERED.load(Ordering::Relaxed)
	);
	Ok(())
}

fn clear_anchors(anchors: &Arc<Mutex<Vec<Point>>>) {
	anchors.lock().clear();
	println!("cleared recorded anchors");
}

fn save_snapshot(state: &mut AppState, args: &RunArgs) -> Result<()> {
	if state.retained.empty() {
		return Ok(());
	}
	let path = args.snapshots.join(format!("cobble-{:04}.png", state.snapshots));
	let path_str = path
		.to_str()
		.wrap_err("invalid snapshot path cannot be represented as a str")?;
	imgcodecs::imwrite(path_str, &state.retained, &Vector::new())
		.wrap_err_with(|| format!("failed to write snapshot to {}", path.display()))?;
	state.snapshots += 1;
	println!("saved frame to {}", path.display());
	Ok(())
}
