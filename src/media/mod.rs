//! Media pipeline module
//!
//! - **MediaFetcher**: downloads remote attachments into temporary files that
//!   are removed when the returned guard is dropped
//! - **DescriptionGenerator**: asks a vision model to describe an image
//! - **Translator**: asks a text model to translate a description
//!
//! # Example
//!
//! ```ignore
//! use alttoot::media::{DescriptionGenerator, ImageSource, MediaFetcher};
//!
//! let fetcher = MediaFetcher::new()?;
//! let image = fetcher.download("https://files.example/cat.png").await?;
//! let description = generator.describe(&image).await?;
//! // `image` is deleted from disk here
//! ```

pub mod analysis;
pub mod fetch;
pub mod translate;

pub use analysis::{DescriptionGenerator, DESCRIBE_PROMPT};
pub use fetch::{DownloadedImage, FetchError, ImageSource, MediaFetcher};
pub use translate::Translator;
