use opencv::core::Size;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("cannot fit a degree-{degree} curve through {distinct} distinct control points")]
	DegenerateCurve { distinct: usize, degree: usize },
	#[error("anchor ({x}, {y}) lies outside the {width}x{height} frame")]
	AnchorOutOfBounds {
		x: i32,
		y: i32,
		width: i32,
		height: i32,
	},
	#[error("overlay shape {overlay:?} does not match frame shape {frame:?}")]
	ShapeMismatch { overlay: Size, frame: Size },
	#[error(transparent)]
	OpenCv(#[from] opencv::Error),
}
