pub mod relational;
pub mod rows;
pub mod spatial;

pub use relational::{visible_row_range, ChainDirection, RelationalIndex};
pub use rows::build_rows;
pub use spatial::SpatialIndex;
