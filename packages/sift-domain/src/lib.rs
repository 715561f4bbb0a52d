pub mod normalize;
pub mod scoring;
pub mod seeds;
