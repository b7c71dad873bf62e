use cobble_core::{
	curve,
	error::Error,
	opencv::core::{Point, Point2d},
};
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn sampler_yields_seven_points_within_bounds() {
	for seed in 0..64 {
		let mut rng = StdRng::seed_from_u64(seed);
		let control = curve::sample_control_points(&mut rng);
		assert_eq!(control.len(), curve::CONTROL_POINTS);
		assert_eq!(control[0], Point2d::new(0.0, 250.0));
		assert!((0.0..20.0).contains(&control[1].x));
		assert!((260.0..265.0).contains(&control[1].y));
		for point in &control[2..] {
			assert!((0.0..200.0).contains(&point.x));
			assert!((50.0..250.0).contains(&point.y));
		}
	}
}

#[test]
fn fitted_curve_has_the_declared_sample_count() {
	let mut rng = StdRng::seed_from_u64(1);
	let control = curve::sample_control_points(&mut rng);
	let fitted = curve::fit_curve(&control).unwrap();
	assert_eq!(fitted.len(), curve::CURVE_SAMPLES);
}

#[test]
fn anchored_curve_centroid_lands_on_the_anchor() {
	let mut rng = StdRng::seed_from_u64(7);
	let anchor = Point::new(400, 275);
	for _ in 0..16 {
		let control = curve::sample_control_points(&mut rng);
		let fitted = curve::fit_curve(&control).unwrap();
		let anchored = curve::anchor_curve(&fitted, anchor, 0.4);
		let count = anchored.len() as f64;
		let (sum_x, sum_y) = anchored.iter().fold((0.0, 0.0), |(sx, sy), point| {
			(sx + f64::from(point.x), sy + f64::from(point.y))
		});
		assert!((sum_x / count - f64::from(anchor.x)).abs() <= 1.0);
		assert!((sum_y / count - f64::from(anchor.y)).abs() <= 1.0);
	}
}

#[test]
fn zero_scale_collapses_the_curve_to_the_anchor() {
	let mut rng = StdRng::seed_from_u64(21);
	let anchor = Point::new(123, 321);
	let control = curve::sample_control_points(&mut rng);
	let fitted = curve::fit_curve(&control).unwrap();
	let anchored = curve::anchor_curve(&fitted, anchor, 0.0);
	assert!(anchored.iter().all(|point| point == anchor));
}

#[test]
fn unit_scale_only_recenters() {
	let mut rng = StdRng::seed_from_u64(33);
	let control = curve::sample_control_points(&mut rng);
	let fitted = curve::fit_curve(&control).unwrap();

	let extent = |points: &[(f64, f64)]| {
		let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
		let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
		let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
		let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
		(max_x - min_x, max_y - min_y)
	};

	let raw: Vec<(f64, f64)> = fitted.iter().map(|p| (p.x, p.y)).collect();
	let anchored: Vec<(f64, f64)> = curve::anchor_curve(&fitted, Point::new(400, 275), 1.0)
		.iter()
		.map(|p| (f64::from(p.x), f64::from(p.y)))
		.collect();

	let (raw_w, raw_h) = extent(&raw);
	let (anchored_w, anchored_h) = extent(&anchored);
	assert!((raw_w - anchored_w).abs() <= 2.0);
	assert!((raw_h - anchored_h).abs() <= 2.0);
}

#[test]
fn duplicate_control_points_are_rejected_as_degenerate() {
	let control = vec![Point2d::new(10.0, 10.0); curve::CONTROL_POINTS];
	assert!(matches!(
		curve::fit_curve(&control),
		Err(Error::DegenerateCurve { .. })
	));
}

#[test]
fn six_distinct_points_out_of_seven_still_fit() {
	let control = vec![
		Point2d::new(0.0, 250.0),
		Point2d::new(12.0, 261.0),
		Point2d::new(40.0, 120.0),
		Point2d::new(40.0, 120.0),
		Point2d::new(90.0, 200.0),
		Point2d::new(150.0, 80.0),
		Point2d::new(190.0, 230.0),
	];
	assert!(curve::fit_curve(&control).is_ok());
}
