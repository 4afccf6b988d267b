pub mod clock;
pub mod error;
pub mod state;

pub use clock::*;
pub use error::*;
pub use state::*;
