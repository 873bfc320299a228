//! Pixel samplers feeding the statistics engine.

mod error;
mod raster;
mod sampler;
mod table;


pub use error::{Result, SampleError};
pub use raster::PlaneStack;
pub use sampler::{ChannelSamples, PixelSampler};
pub use table::{SampleEntry, SampleTable};
