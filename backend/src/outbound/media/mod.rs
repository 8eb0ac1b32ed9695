//! Media store adapters implementing the `MediaStore` port.

mod filesystem;

pub use filesystem::FilesystemMediaStore;
