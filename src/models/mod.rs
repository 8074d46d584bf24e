pub mod audit;
pub mod document;
pub mod enums;
pub mod outcome;
pub mod request;

pub use audit::*;
pub use document::*;
pub use enums::*;
pub use outcome::*;
pub use request::*;
