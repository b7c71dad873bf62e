pub mod curve;
pub mod detect;
pub mod error;
pub mod trail;

pub use opencv;

use rand::{rngs::StdRng, SeedableRng};
use std::sync::atomic::AtomicUsize;

pub static TRAILS_RENDERED: AtomicUsize = AtomicUsize::new(0);

pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
	match seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	}
}
