pub mod images;
pub mod landing;
