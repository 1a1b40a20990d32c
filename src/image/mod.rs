pub mod frame;
pub mod io;
pub mod traits;

pub use self::frame::{FrameBuf, FrameView};
pub use self::traits::{PixelRows, Rows};
