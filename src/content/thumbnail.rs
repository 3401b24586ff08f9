use image::imageops::FilterType;
use std::fs;
use std::path::{Path, PathBuf};

/// Size of generated thumbnails (square)
const THUMBNAIL_SIZE: u32 = 256;

/// Get the thumbnail cache directory
/// Returns ~/.cache/image-vault/thumbnails on Linux
pub fn default_cache_dir() -> PathBuf {
    let mut path = dirs_next::cache_dir()
        .or_else(dirs_next::home_dir)
        .expect("Could not determine cache directory");

    path.push("image-vault");
    path.push("thumbnails");
    path
}

/// Generate a grid thumbnail for an image file
/// Returns the path to the saved thumbnail, or None if generation failed
pub fn generate_thumbnail(content_path: &Path, cache_dir: &Path) -> Option<PathBuf> {
    fs::create_dir_all(cache_dir).ok()?;

    let img = image::open(content_path).ok()?;
    let thumbnail = img.resize(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);

    // Content files are versioned, so the stem is unique per content revision.
    // PNG output keeps alpha channels intact.
    let stem = content_path.file_stem()?.to_string_lossy();
    let thumbnail_path = cache_dir.join(format!("{}.png", stem));

    thumbnail.save(&thumbnail_path).ok()?;

    println!("📸 Generated thumbnail: {}", thumbnail_path.display());
    Some(thumbnail_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "image-vault-thumb-{}-{}",
            std::process::id(),
            name
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_generate_thumbnail() {
        let dir = temp_dir("generate");
        let content = dir.join("photo-123.png");
        let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([10, 200, 60, 255]));
        img.save(&content).unwrap();

        let cache = dir.join("cache");
        let thumb = generate_thumbnail(&content, &cache).unwrap();

        assert!(thumb.exists());
        assert_eq!(thumb.file_name().unwrap().to_string_lossy(), "photo-123.png");
    }

    #[test]
    fn test_generate_thumbnail_missing_source() {
        let dir = temp_dir("missing");
        let cache = dir.join("cache");

        assert!(generate_thumbnail(Path::new("/nonexistent/photo.png"), &cache).is_none());
    }
}
