pub mod image_io;
pub mod ser;
pub mod ser_writer;
pub mod timestamp;
