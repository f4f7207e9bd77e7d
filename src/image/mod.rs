pub mod f32;
pub mod io;
pub mod mask;

pub use self::f32::ImageF32;
pub use self::mask::MaskImage;
