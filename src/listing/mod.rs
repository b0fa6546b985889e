pub mod assemble;
pub mod model;
pub mod normalize;
