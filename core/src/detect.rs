use color_eyre::eyre::{eyre, Result, WrapErr};
use log::info;
use ndarray::{Array4, ArrayView2, Axis};
use opencv::{
	core::{Mat, Point, Rect, Scalar, Size, CV_8UC3},
	imgproc,
	prelude::*,
};
use ort::{
	session::{builder::GraphOptimizationLevel, Session},
	value::Tensor,
};
use std::{collections::HashMap, path::Path};

pub const INPUT_SIZE: i32 = 640;
const IOU_THRESHOLD: f32 = 0.45;

#[derive(Debug, Clone)]
pub struct Detection {
	pub rect: Rect,
	pub score: f32,
	pub class_id: usize,
}

pub trait Detector {
	fn annotate(&mut self, frame: &Mat, confidence: f32) -> Result<Mat>;
}

pub struct OnnxDetector {
	session: Session,
	input_name: String,
	class_names: Vec<String>,
}

impl OnnxDetector {
	pub fn load(model: &Path, class_names: Vec<String>) -> Result<Self> {
		let session = Session::builder()?
			.with_optimization_level(GraphOptimizationLevel::Level3)?
			.with_intra_threads(4)?
			.commit_from_file(model)
			.wrap_err_with(|| format!("failed to load detection model from {}", model.display()))?;
		let input_name = session.inputs()[0].name().to_string();
		info!(
			"loaded detection model from {} (input {input_name}, {} classes)",
			model.display(),
			class_names.len()
		);
		Ok(Self {
			session,
			input_name,
			class_names,
		})
	}

	pub fn detect(&mut self, frame: &Mat, confidence: f32) -> Result<Vec<Detection>> {
		let classes = self.class_names.len();
		let frame_size = frame.size()?;
		let (tensor, scale, pad_left, pad_top) = letterbox_tensor(frame, INPUT_SIZE)?;
		let shape = tensor.shape();
		let data: Vec<f32> = tensor.iter().copied().collect();
		let input = Tensor::from_array((shape, data))?;
		let mut inputs = HashMap::new();
		inputs.insert(self.input_name.as_str(), input);
		let outputs = self.session.run(inputs)?;
		let (out_shape, out_data) = outputs[0].try_extract_tensor::<f32>()?;
		decode_output(
			out_shape, out_data, frame_size, scale, pad_left, pad_top, confidence, classes,
		)
	}
}

impl Detector for OnnxDetector {
	fn annotate(&mut self, frame: &Mat, confidence: f32) -> Result<Mat> {
		let detections = self.detect(frame, confidence)?;
		let mut annotated = frame.clone();
		draw_detections(&mut annotated, &detections, &self.class_names)?;
		Ok(annotated)
	}
}

pub fn draw_detections(frame: &mut Mat, detections: &[Detection], class_names: &[String]) -> Result<()> {
	let color = Scalar::new(0.0, 255.0, 0.0, 0.0);
	for detection in detections {
		let label = match class_names.get(detection.class_id) {
			Some(name) => format!("{name} {:.2}", detection.score),
			None => format!("#{} {:.2}", detection.class_id, detection.score),
		};
		imgproc::rectangle(frame, detection.rect, color, 2, imgproc::LINE_8, 0)?;
		imgproc::put_text(
			frame,
			&label,
			Point::new(detection.rect.x, detection.rect.y - 10),
			imgproc::FONT_HERSHEY_SIMPLEX,
			0.5,
			color,
			2,
			imgproc::LINE_8,
			false,
		)?;
	}
	Ok(())
}

// Scale to fit, pad to a square, and stage as a normalized RGB CHW tensor.
fn letterbox_tensor(frame: &Mat, input_size: i32) -> Result<(Array4<f32>, f32, i32, i32)> {
	let size = frame.size()?;
	let (scale, new_w, new_h, pad_left, pad_top) = letterbox_geometry(size, input_size);

	let mut resized = Mat::default();
	imgproc::resize(
		frame,
		&mut resized,
		Size::new(new_w, new_h),
		0.0,
		0.0,
		imgproc::INTER_LINEAR,
	)?;

	let padded = Mat::new_rows_cols_with_default(
		input_size,
		input_size,
		CV_8UC3,
		Scalar::new(114.0, 114.0, 114.0, 0.0),
	)?;
	let mut roi = Mat::roi(&padded, Rect::new(pad_left, pad_top, new_w, new_h))?;
	resized.copy_to(&mut roi)?;

	let mut rgb = Mat::default();
	imgproc::cvt_color(&padded, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

	let side = input_size as usize;
	let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
	let bytes = rgb.data_bytes()?;
	for y in 0..side {
		for x in 0..side {
			let idx = (y * side + x) * 3;
			tensor[[0, 0, y, x]] = f32::from(bytes[idx]) / 255.0;
			tensor[[0, 1, y, x]] = f32::from(bytes[idx + 1]) / 255.0;
			tensor[[0, 2, y, x]] = f32::from(bytes[idx + 2]) / 255.0;
		}
	}
	Ok((tensor, scale, pad_left, pad_top))
}

fn letterbox_geometry(size: Size, input_size: i32) -> (f32, i32, i32, i32, i32) {
	let scale = (input_size as f32 / size.height as f32).min(input_size as f32 / size.width as f32);
	let new_w = (size.width as f32 * scale) as i32;
	let new_h = (size.height as f32 * scale) as i32;
	let pad_left = (input_size - new_w) / 2;
	let pad_top = (input_size - new_h) / 2;
	(scale, new_w, new_h, pad_left, pad_top)
}

// Accepts both [1, 4+C, N] and [1, N, 4+C] head layouts.
#[allow(clippy::too_many_arguments)]
fn decode_output(
	shape: &[i64],
	data: &[f32],
	frame_size: Size,
	scale: f32,
	pad_left: i32,
	pad_top: i32,
	confidence: f32,
	classes: usize,
) -> Result<Vec<Detection>> {
	let attrs = 4 + classes;
	if shape.len() != 3 || shape[0] != 1 {
		return Err(eyre!("unsupported detector output shape {shape:?}"));
	}
	let (rows, transposed) = if shape[1] as usize == attrs {
		(shape[2] as usize, true)
	} else if shape[2] as usize == attrs {
		(shape[1] as usize, false)
	} else {
		return Err(eyre!(
			"detector output shape {shape:?} does not match {classes} class(es)"
		));
	};

	let mut flat = vec![0f32; rows * attrs];
	if transposed {
		for row in 0..rows {
			for attr in 0..attrs {
				flat[row * attrs + attr] = data[attr * rows + row];
			}
		}
	} else {
		flat.copy_from_slice(&data[..rows * attrs]);
	}
	let output = ArrayView2::from_shape((rows, attrs), &flat)?;

	let mut candidates = Vec::new();
	for row in output.axis_iter(Axis(0)) {
		let (class_id, score) = row
			.iter()
			.skip(4)
			.copied()
			.enumerate()
			.fold((0, f32::NEG_INFINITY), |(best_id, best), (id, value)| {
				if value > best {
					(id, value)
				} else {
					(best_id, best)
				}
			});
		if score < confidence {
			continue;
		}

		let (center_x, center_y, width, height) = (row[0], row[1], row[2], row[3]);
		let x1 = unletterbox(center_x - width / 2.0, pad_left, scale, frame_size.width);
		let y1 = unletterbox(center_y - height / 2.0, pad_top, scale, frame_size.height);
		let x2 = unletterbox(center_x + width / 2.0, pad_left, scale, frame_size.width);
		let y2 = unletterbox(center_y + height / 2.0, pad_top, scale, frame_size.height);
		candidates.push(Detection {
			rect: Rect::new(
				x1 as i32,
				y1 as i32,
				((x2 - x1) as i32).max(1),
				((y2 - y1) as i32).max(1),
			),
			score,
			class_id,
		});
	}

	Ok(non_max_suppression(candidates, IOU_THRESHOLD))
}

fn unletterbox(coord: f32, pad: i32, scale: f32, limit: i32) -> f32 {
	((coord - pad as f32) / scale).clamp(0.0, limit as f32)
}

fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
	candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
	let mut kept: Vec<Detection> = Vec::new();
	'candidates: for detection in candidates {
		for prior in &kept {
			if prior.class_id == detection.class_id
				&& iou(&prior.rect, &detection.rect) > iou_threshold
			{
				continue 'candidates;
			}
		}
		kept.push(detection);
	}
	kept
}

fn iou(a: &Rect, b: &Rect) -> f32 {
	let x1 = a.x.max(b.x);
	let y1 = a.y.max(b.y);
	let x2 = (a.x + a.width).min(b.x + b.width);
	let y2 = (a.y + a.height).min(b.y + b.height);
	let intersection = ((x2 - x1).max(0) * (y2 - y1).max(0)) as f32;
	let union = (a.width * a.height + b.width * b.height) as f32 - intersection;
	if union <= 0.0 {
		return 0.0;
	}
	intersection / union
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn iou_of_identical_boxes_is_one() {
		let rect = Rect::new(10, 10, 50, 50);
		assert!((iou(&rect, &rect) - 1.0).abs() < f32::EPSILON);
	}

	#[test]
	fn iou_of_disjoint_boxes_is_zero() {
		let a = Rect::new(0, 0, 10, 10);
		let b = Rect::new(100, 100, 10, 10);
		assert_eq!(iou(&a, &b), 0.0);
	}

	#[test]
	fn nms_keeps_the_highest_scoring_overlap() {
		let kept = non_max_suppression(
			vec![
				Detection {
					rect: Rect::new(10, 10, 50, 50),
					score: 0.6,
					class_id: 0,
				},
				Detection {
					rect: Rect::new(12, 12, 50, 50),
					score: 0.9,
					class_id: 0,
				},
			],
			IOU_THRESHOLD,
		);
		assert_eq!(kept.len(), 1);
		assert_eq!(kept[0].score, 0.9);
	}

	#[test]
	fn nms_never_merges_across_classes() {
		let kept = non_max_suppression(
			vec![
				Detection {
					rect: Rect::new(10, 10, 50, 50),
					score: 0.6,
					class_id: 0,
				},
				Detection {
					rect: Rect::new(10, 10, 50, 50),
					score: 0.9,
					class_id: 1,
				},
			],
			IOU_THRESHOLD,
		);
		assert_eq!(kept.len(), 2);
	}

	#[test]
	fn letterbox_geometry_centers_the_pad() {
		let (scale, new_w, new_h, pad_left, pad_top) =
			letterbox_geometry(Size::new(1280, 720), 640);
		assert!((scale - 0.5).abs() < f32::EPSILON);
		assert_eq!((new_w, new_h), (640, 360));
		assert_eq!(pad_left, 0);
		assert_eq!(pad_top, 140);
	}

	#[test]
	fn decode_handles_both_head_layouts() {
		// One class, two candidate rows, one above threshold.
		let rows = [
			[320.0, 320.0, 100.0, 50.0, 0.9f32],
			[100.0, 100.0, 20.0, 20.0, 0.1],
		];
		let flat: Vec<f32> = rows.iter().flatten().copied().collect();
		let mut transposed = vec![0f32; flat.len()];
		for row in 0..2 {
			for attr in 0..5 {
				transposed[attr * 2 + row] = rows[row][attr];
			}
		}

		for (shape, data) in [(vec![1i64, 2, 5], &flat), (vec![1i64, 5, 2], &transposed)] {
			let detections = decode_output(
				&shape,
				data,
				Size::new(640, 640),
				1.0,
				0,
				0,
				0.5,
				1,
			)
			.unwrap();
			assert_eq!(detections.len(), 1);
			assert_eq!(detections[0].rect, Rect::new(270, 295, 100, 50));
			assert_eq!(detections[0].class_id, 0);
		}
	}
}
