pub mod costs;
pub mod train;
pub mod util;
