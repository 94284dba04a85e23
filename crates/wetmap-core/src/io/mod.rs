pub mod archive;
pub mod image_io;
pub mod sink;
