mod error;
mod poisson;
mod utils;

#[cfg(test)]
mod test_utils;

use image::{ImageBuffer, Pixel};

pub use error::{CloneResult, Error};
pub use poisson::active_region::{ActiveRegion, MASK_THRESHOLD};
pub use poisson::factorization::{Factorization, FactorizationCache};
pub use poisson::gradient::{EdgeSample, GradientPolicy};
pub use poisson::ordering::EliminationOrder;
pub use poisson::seamless_clone::SeamlessClone;
pub use poisson::session::{CloneReport, CloneSession};
pub use poisson::solver::{scatter_channel, ChannelSolver, ChannelStats};
pub use poisson::system::{Offset, PoissonSystemBuilder, SparseSystem, SystemMatrix, CHANNELS};

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
