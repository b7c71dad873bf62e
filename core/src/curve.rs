use crate::error::{Error, Result};
use nalgebra::{SMatrix, SVector};
use opencv::core::{Point, Point2d, Vector};
use rand::Rng;

pub const CONTROL_POINTS: usize = 7;
pub const CURVE_SAMPLES: usize = 2000;

const DEGREE: usize = 5;
const COEFFS: usize = DEGREE + 1;
const ORIGIN_X: f64 = 0.0;
const ORIGIN_Y: f64 = 250.0;

pub fn sample_control_points<R: Rng>(rng: &mut R) -> Vec<Point2d> {
	let mut points = Vec::with_capacity(CONTROL_POINTS);
	points.push(Point2d::new(ORIGIN_X, ORIGIN_Y));
	points.push(Point2d::new(
		ORIGIN_X + f64::from(rng.random_range(0..20)),
		ORIGIN_Y + f64::from(rng.random_range(10..15)),
	));
	for _ in 0..CONTROL_POINTS - 2 {
		points.push(Point2d::new(
			f64::from(rng.random_range(0..200)),
			f64::from(rng.random_range(50..250)),
		));
	}
	points
}

pub fn fit_curve(control: &[Point2d]) -> Result<Vec<Point2d>> {
	let distinct = distinct_points(control);
	if distinct <= DEGREE {
		return Err(Error::DegenerateCurve {
			distinct,
			degree: DEGREE,
		});
	}

	let params = chord_parameters(control);

	// Least-squares fit of a degree-5 polynomial per axis over the chord
	// parameterization, via the normal equations.
	let mut ata = SMatrix::<f64, COEFFS, COEFFS>::zeros();
	let mut atx = SVector::<f64, COEFFS>::zeros();
	let mut aty = SVector::<f64, COEFFS>::zeros();
	for (point, u) in control.iter().zip(&params) {
		let mut basis = [0.0; COEFFS];
		let mut power = 1.0;
		for entry in &mut basis {
			*entry = power;
			power *= u;
		}
		for row in 0..COEFFS {
			for col in 0..COEFFS {
				ata[(row, col)] += basis[row] * basis[col];
			}
			atx[row] += basis[row] * point.x;
			aty[row] += basis[row] * point.y;
		}
	}

	let lu = ata.lu();
	let (coeffs_x, coeffs_y) = match (lu.solve(&atx), lu.solve(&aty)) {
		(Some(x), Some(y)) => (x, y),
		_ => {
			return Err(Error::DegenerateCurve {
				distinct,
				degree: DEGREE,
			})
		}
	};

	let mut curve = Vec::with_capacity(CURVE_SAMPLES);
	for sample in 0..CURVE_SAMPLES {
		let u = sample as f64 / (CURVE_SAMPLES - 1) as f64;
		curve.push(Point2d::new(horner(&coeffs_x, u), horner(&coeffs_y, u)));
	}
	Ok(curve)
}

pub fn anchor_curve(curve: &[Point2d], anchor: Point, scale: f64) -> Vector<Point> {
	let count = curve.len() as f64;
	let centroid = curve
		.iter()
		.fold(Point2d::new(0.0, 0.0), |sum, point| {
			Point2d::new(sum.x + point.x, sum.y + point.y)
		});
	let centroid = Point2d::new(centroid.x / count, centroid.y / count);

	curve
		.iter()
		.map(|point| {
			Point::new(
				((point.x - centroid.x) * scale + f64::from(anchor.x)).round() as i32,
				((point.y - centroid.y) * scale + f64::from(anchor.y)).round() as i32,
			)
		})
		.collect()
}

fn distinct_points(points: &[Point2d]) -> usize {
	let mut distinct: Vec<Point2d> = Vec::with_capacity(points.len());
	for point in points {
		if !distinct
			.iter()
			.any(|seen| seen.x == point.x && seen.y == point.y)
		{
			distinct.push(*point);
		}
	}
	distinct.len()
}

fn chord_parameters(points: &[Point2d]) -> Vec<f64> {
	let mut params = Vec::with_capacity(points.len());
	params.push(0.0);
	let mut total = 0.0;
	for pair in points.windows(2) {
		total += (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y);
		params.push(total);
	}
	// Total chord length is nonzero whenever the points are not all equal,
	// which the distinct-point gate already guarantees.
	for param in &mut params {
		*param /= total;
	}
	params
}

fn horner(coeffs: &SVector<f64, COEFFS>, u: f64) -> f64 {
	let mut value = 0.0;
	for index in (0..COEFFS).rev() {
		value = value * u + coeffs[index];
	}
	value
}
