pub mod analysis;
pub mod avalanche;
pub mod criticality;
pub mod density;
pub mod least_squares;
pub mod params;
pub mod pooling;
pub mod power_law;
pub mod recording;
pub mod results;

mod types;
mod util;
