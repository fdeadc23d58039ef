pub mod clock;
pub mod latch;
pub mod shutdown;
pub mod telemetry;

pub use clock::*;
pub use latch::*;
pub use shutdown::*;
pub use telemetry::*;
