pub mod analysis;
pub mod interface_info;
pub mod user_interface_info;

pub use analysis::*;
pub use interface_info::*;
pub use user_interface_info::*;
