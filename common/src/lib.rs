pub mod error;
pub mod fallback;
pub mod format;
pub mod timing;
pub mod transform;
pub mod types;

pub use error::*;
pub use fallback::fallback;
pub use timing::{Clock, ManualClock, SystemClock};
pub use transform::transform;
pub use types::*;
