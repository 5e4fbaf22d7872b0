pub mod cookies;
pub mod image;
pub mod password;

pub use self::image::{EncodedImage, ImageStore};
