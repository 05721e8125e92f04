pub mod delay;
pub mod error;
pub mod logging;

pub use delay::DelayRange;
pub use error::AppError;
