pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Image(#[from] image::ImageError),
	#[error("{message}")]
	Pdf { message: String },
	#[error("{message}")]
	Rasterize { message: String },
	#[error("{message}")]
	Engine { message: String },
}
