pub mod load;
pub mod types;

pub use load::{load_table, parse_table};
pub use types::{Cell, MetricTable};
