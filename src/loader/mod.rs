//! Image Loaders
//!
//! Async fetch and decode of strip item bitmaps.

use image::RgbaImage;
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Errors a loader can hit while fetching one item
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image fetch returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One load issued by the cache for a single slot
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Slot index in the installed sequence
    pub index: usize,

    /// Generation of the sequence this request belongs to
    pub generation: u64,

    /// URL or file path of the image
    pub image_ref: String,

    /// Width the bitmap is scaled and cropped to
    pub target_width: u32,

    /// Height the bitmap is scaled and cropped to
    pub target_height: u32,

    /// Channel the result is delivered on
    pub reply: UnboundedSender<LoadCompletion>,
}

/// Result of one load, delivered back to the render loop.
///
/// `bitmap` is `None` when the load failed; the error itself is logged at
/// the loader and does not travel.
#[derive(Debug)]
pub struct LoadCompletion {
    pub index: usize,
    pub generation: u64,
    pub bitmap: Option<RgbaImage>,
}

/// Asynchronous source of item bitmaps.
///
/// `request` must not block. Completions travel through the request's
/// `reply` channel at an arbitrary later point; implementations never touch
/// slot state directly.
pub trait ImageLoader: Send + Sync {
    fn request(&self, req: LoadRequest);
}

/// Loader fetching items over HTTP
pub struct HttpImageLoader {
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
}

impl HttpImageLoader {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flowstrip/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, runtime }
    }

    /// Fetch and decode one image
    async fn fetch(
        client: &reqwest::Client,
        url: &str,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, LoadError> {
        let response = client
            .get(url)
            .header("Accept", "image/webp,image/png,image/jpeg,*/*")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LoadError::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        decode_and_fit(&bytes, width, height)
    }
}

impl ImageLoader for HttpImageLoader {
    fn request(&self, req: LoadRequest) {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            let LoadRequest {
                index,
                generation,
                image_ref,
                target_width,
                target_height,
                reply,
            } = req;

            let bitmap = match Self::fetch(&client, &image_ref, target_width, target_height).await {
                Ok(bitmap) => {
                    debug!("Loaded image: {} ({}x{})", image_ref, target_width, target_height);
                    Some(bitmap)
                }
                Err(e) => {
                    warn!("Failed to load image {}: {}", image_ref, e);
                    None
                }
            };

            // The receiving cache may be gone by delivery time; nothing to do then
            let _ = reply.send(LoadCompletion {
                index,
                generation,
                bitmap,
            });
        });
    }
}

/// Loader reading items from the local filesystem
pub struct FileImageLoader {
    runtime: tokio::runtime::Handle,
}

impl FileImageLoader {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    async fn read(path: &str, width: u32, height: u32) -> Result<RgbaImage, LoadError> {
        let bytes = tokio::fs::read(path).await?;
        decode_and_fit(&bytes, width, height)
    }
}

impl ImageLoader for FileImageLoader {
    fn request(&self, req: LoadRequest) {
        self.runtime.spawn(async move {
            let LoadRequest {
                index,
                generation,
                image_ref,
                target_width,
                target_height,
                reply,
            } = req;

            let bitmap = match Self::read(&image_ref, target_width, target_height).await {
                Ok(bitmap) => Some(bitmap),
                Err(e) => {
                    warn!("Failed to load image {}: {}", image_ref, e);
                    None
                }
            };

            let _ = reply.send(LoadCompletion {
                index,
                generation,
                bitmap,
            });
        });
    }
}

/// Decode raw bytes and scale/crop the result to exactly `width x height`
fn decode_and_fit(bytes: &[u8], width: u32, height: u32) -> Result<RgbaImage, LoadError> {
    let img = image::load_from_memory(bytes)?;

    // Degenerate target: hand back the decoded image untouched
    if width == 0 || height == 0 {
        return Ok(img.to_rgba8());
    }

    let fitted = img.resize_to_fill(width, height, image::imageops::FilterType::Triangle);
    Ok(fitted.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_and_fit_scales_to_target() {
        let bytes = png_bytes(64, 32);

        let bitmap = decode_and_fit(&bytes, 16, 16).unwrap();

        assert_eq!(bitmap.width(), 16);
        assert_eq!(bitmap.height(), 16);
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let err = decode_and_fit(b"not an image", 16, 16);
        assert!(matches!(err, Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_file_loader_delivers_completion() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let path = std::env::temp_dir().join("flowstrip_loader_test.png");
        std::fs::write(&path, png_bytes(8, 8)).unwrap();

        let loader = FileImageLoader::new(runtime.handle().clone());
        loader.request(LoadRequest {
            index: 3,
            generation: 7,
            image_ref: path.to_string_lossy().into_owned(),
            target_width: 4,
            target_height: 4,
            reply: tx,
        });

        let completion = rx.blocking_recv().unwrap();
        assert_eq!(completion.index, 3);
        assert_eq!(completion.generation, 7);
        let bitmap = completion.bitmap.unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (4, 4));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_loader_reports_missing_file_as_failed() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let loader = FileImageLoader::new(runtime.handle().clone());
        loader.request(LoadRequest {
            index: 0,
            generation: 1,
            image_ref: "/nonexistent/flowstrip.png".to_string(),
            target_width: 4,
            target_height: 4,
            reply: tx,
        });

        let completion = rx.blocking_recv().unwrap();
        assert!(completion.bitmap.is_none());
    }
}
