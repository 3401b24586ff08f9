use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::data::{ImageDescriptor, ImageResource};
use crate::content::{store, thumbnail};

/// Errors from catalog and content-store operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Content(#[from] store::ContentError),
    #[error("image not found: {0}")]
    NotFound(String),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

/// Filesystem locations backing a Library.
/// Cloned into background tasks, which open their own connections.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// The SQLite catalog database file
    pub db: PathBuf,
    /// Directory holding the image binaries
    pub content: PathBuf,
    /// Directory holding cached grid thumbnails
    pub cache: PathBuf,
}

impl StorePaths {
    /// Default locations under the user's data and cache directories
    pub fn default_paths() -> Self {
        let mut db = dirs::data_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine user data directory");
        db.push("image-vault");
        db.push("image_vault.db");

        StorePaths {
            db,
            content: store::default_content_dir(),
            cache: thumbnail::default_cache_dir(),
        }
    }
}

/// The Library manages the SQLite catalog database and the content store.
/// It stores image metadata and owns the files in the content directory.
pub struct Library {
    conn: Connection,
    paths: StorePaths,
}

impl Library {
    /// Create a Library at the default locations and initialize the database.
    pub fn new() -> LibraryResult<Self> {
        let paths = StorePaths::default_paths();
        println!("📁 Database initialized at: {}", paths.db.display());
        Self::open(paths)
    }

    /// Open (or create) the catalog at explicit locations
    pub fn open(paths: StorePaths) -> LibraryResult<Self> {
        if let Some(parent) = paths.db.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&paths.content)?;
        std::fs::create_dir_all(&paths.cache)?;

        let conn = Connection::open(&paths.db)?;

        let mut library = Library { conn, paths };
        library.init_schema()?;

        Ok(library)
    }

    /// The filesystem locations backing this library
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&mut self) -> LibraryResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_key    TEXT NOT NULL UNIQUE,
                title           TEXT NOT NULL,
                file_name       TEXT NOT NULL,
                media_type      TEXT NOT NULL,
                content_path    TEXT NOT NULL,
                descriptor_json TEXT,
                imported_at     INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL,
                file_status     TEXT DEFAULT 'exists',
                thumbnail_path  TEXT,
                cache_status    TEXT DEFAULT 'pending'
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_imported_at
             ON images(imported_at DESC)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_images_cache_status
             ON images(cache_status)",
            [],
        )?;

        Ok(())
    }

    /// Column list matching `row_to_image`
    const IMAGE_COLUMNS: &'static str = "id, resource_key, title, file_name, media_type, \
         content_path, descriptor_json, COALESCE(file_status, 'exists'), thumbnail_path";

    fn row_to_image(row: &rusqlite::Row) -> rusqlite::Result<ImageResource> {
        let descriptor_json: Option<String> = row.get(6)?;
        let descriptor = descriptor_json
            .as_deref()
            .and_then(|json| ImageDescriptor::from_json(json).ok())
            .unwrap_or_default();

        Ok(ImageResource {
            id: row.get(0)?,
            key: row.get(1)?,
            title: row.get(2)?,
            file_name: row.get(3)?,
            media_type: row.get(4)?,
            content_path: row.get(5)?,
            descriptor,
            file_status: row.get(7)?,
            thumbnail_path: row.get(8)?,
        })
    }

    /// Get a count of images in the library
    pub fn image_count(&self) -> LibraryResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get one image by its resource key
    pub fn get_image(&self, key: &str) -> LibraryResult<ImageResource> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM images WHERE resource_key = ?1",
                    Self::IMAGE_COLUMNS
                ),
                [key],
                Self::row_to_image,
            )
            .optional()?
            .ok_or_else(|| LibraryError::NotFound(key.to_string()))
    }

    /// Get all images from the library, ordered by import date (newest first)
    pub fn get_all_images(&self) -> LibraryResult<Vec<ImageResource>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM images ORDER BY imported_at DESC, id DESC",
            Self::IMAGE_COLUMNS
        ))?;

        let image_iter = stmt.query_map([], Self::row_to_image)?;

        let mut images = Vec::new();
        for image in image_iter {
            images.push(image?);
        }

        Ok(images)
    }

    /// Import a new image file into the library.
    /// The file is validated, copied into the content store, and cataloged.
    /// Returns None when an image with the same resource key already exists.
    pub fn import_image(&self, source: &Path) -> LibraryResult<Option<ImageResource>> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| LibraryError::NotFound(source.display().to_string()))?;
        let key = file_name.clone();

        // Duplicate check up front so a skip never copies content
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM images WHERE resource_key = ?1",
                [&key],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(None);
        }

        // Rejects files that merely carry an image extension
        let (media_type, descriptor) = store::probe_image(source)?;

        let title = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.clone());

        let content_path = store::store_content(&self.paths.content, &key, source)?;
        let now = Utc::now().timestamp();

        self.conn.execute(
            "INSERT INTO images (resource_key, title, file_name, media_type, content_path,
                                 descriptor_json, imported_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            rusqlite::params![
                key,
                title,
                file_name,
                media_type,
                content_path.to_string_lossy(),
                descriptor.to_json().ok(),
                now,
            ],
        )?;

        self.get_image(&key).map(Some)
    }

    /// Persist a metadata update. Only the title (and updated_at) change;
    /// content, key, and media columns are untouched.
    pub fn update_image_info(&self, image: &ImageResource) -> LibraryResult<ImageResource> {
        let updated = self.conn.execute(
            "UPDATE images SET title = ?1, updated_at = ?2 WHERE resource_key = ?3",
            rusqlite::params![image.title, Utc::now().timestamp(), image.key],
        )?;

        if updated == 0 {
            return Err(LibraryError::NotFound(image.key.clone()));
        }

        self.get_image(&image.key)
    }

    /// Replace an image's binary content with a new file.
    ///
    /// The source is validated, written to the store under a fresh versioned
    /// path, and the stale content file and thumbnail are dropped. Returns
    /// the updated resource.
    pub fn replace_content(&self, key: &str, source: &Path) -> LibraryResult<ImageResource> {
        let current = self.get_image(key)?;

        let (media_type, descriptor) = store::probe_image(source)?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| current.file_name.clone());

        let content_path = store::store_content(&self.paths.content, key, source)?;
        let thumb = thumbnail::generate_thumbnail(&content_path, &self.paths.cache);

        self.conn.execute(
            "UPDATE images SET content_path = ?1, media_type = ?2, file_name = ?3,
                               descriptor_json = ?4, updated_at = ?5, file_status = 'exists',
                               thumbnail_path = ?6, cache_status = ?7
             WHERE resource_key = ?8",
            rusqlite::params![
                content_path.to_string_lossy(),
                media_type,
                file_name,
                descriptor.to_json().ok(),
                Utc::now().timestamp(),
                thumb.as_ref().map(|p| p.to_string_lossy().to_string()),
                if thumb.is_some() { "cached" } else { "pending" },
                key,
            ],
        )?;

        store::remove_content(&current.content_path);
        if let Some(old_thumb) = &current.thumbnail_path {
            store::remove_content(old_thumb);
        }

        self.get_image(key)
    }

    /// Verify that content files still exist on disk.
    /// Mark rows as 'missing' if the file is gone.
    pub fn verify_content(&self) -> LibraryResult<usize> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, content_path FROM images WHERE file_status = 'exists'")?;

        let existing: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        let mut missing_count = 0;
        for (id, content_path) in existing {
            if !Path::new(&content_path).exists() {
                self.conn.execute(
                    "UPDATE images SET file_status = 'missing' WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                missing_count += 1;
            }
        }

        if missing_count > 0 {
            println!("⚠️  Marked {} images with missing content", missing_count);
        }

        Ok(missing_count)
    }

    /// Get images that still need a grid thumbnail
    pub fn get_pending_thumbnails(&self, limit: usize) -> LibraryResult<Vec<ImageResource>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM images
             WHERE cache_status = 'pending' AND file_status = 'exists'
             LIMIT ?1",
            Self::IMAGE_COLUMNS
        ))?;

        let image_iter = stmt.query_map([limit], Self::row_to_image)?;

        let mut images = Vec::new();
        for image in image_iter {
            images.push(image?);
        }

        Ok(images)
    }

    /// Generate and record the grid thumbnail for one image.
    /// Failures are recorded so the image is not retried every pass.
    pub fn generate_thumbnail_for(&self, image: &ImageResource) -> LibraryResult<bool> {
        match thumbnail::generate_thumbnail(Path::new(&image.content_path), &self.paths.cache) {
            Some(thumb) => {
                self.conn.execute(
                    "UPDATE images SET thumbnail_path = ?1, cache_status = 'cached'
                     WHERE resource_key = ?2",
                    rusqlite::params![thumb.to_string_lossy(), image.key],
                )?;
                Ok(true)
            }
            None => {
                self.conn.execute(
                    "UPDATE images SET cache_status = 'failed' WHERE resource_key = ?1",
                    rusqlite::params![image.key],
                )?;
                Ok(false)
            }
        }
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.paths.db)
            .finish()
    }
}

/// Persist a metadata update on a background thread.
/// rusqlite::Connection is not Send, so the task opens its own connection.
pub async fn update_image_info_async(
    paths: StorePaths,
    image: ImageResource,
) -> Result<ImageResource, String> {
    tokio::task::spawn_blocking(move || {
        let library = Library::open(paths)?;
        library.update_image_info(&image)
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
    .map_err(|e| e.to_string())
}

/// Replace an image's content on a background thread.
pub async fn replace_content_async(
    paths: StorePaths,
    key: String,
    source: PathBuf,
) -> Result<ImageResource, String> {
    tokio::task::spawn_blocking(move || {
        let library = Library::open(paths)?;
        library.replace_content(&key, &source)
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
    .map_err(|e| e.to_string())
}

/// Copy an image's content to a user-chosen destination.
/// Returns the destination path for the status line.
pub async fn download_content_async(content_path: String, dest: PathBuf) -> Result<String, String> {
    tokio::task::spawn_blocking(move || {
        store::export_content(&content_path, &dest)?;
        Ok::<String, store::ContentError>(dest.display().to_string())
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))?
    .map_err(|e| e.to_string())
}

/// Generate thumbnails for catalog rows that still lack one.
/// Returns how many thumbnails were generated.
pub async fn generate_pending_thumbnails_async(paths: StorePaths) -> usize {
    tokio::task::spawn_blocking(move || {
        let library = match Library::open(paths) {
            Ok(library) => library,
            Err(e) => {
                eprintln!("⚠️  Failed to open library for thumbnails: {}", e);
                return 0;
            }
        };

        let mut generated = 0;
        loop {
            let pending = match library.get_pending_thumbnails(32) {
                Ok(pending) => pending,
                Err(e) => {
                    eprintln!("⚠️  Failed to query pending thumbnails: {}", e);
                    break;
                }
            };
            if pending.is_empty() {
                break;
            }

            for image in &pending {
                match library.generate_thumbnail_for(image) {
                    Ok(true) => generated += 1,
                    Ok(false) => {
                        eprintln!("⚠️  Could not generate thumbnail for {}", image.key)
                    }
                    Err(e) => eprintln!("⚠️  {}", e),
                }
            }
        }

        generated
    })
    .await
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn temp_paths() -> StorePaths {
        let seq = TEST_SEQ.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir().join(format!(
            "image-vault-library-{}-{}",
            std::process::id(),
            seq
        ));
        StorePaths {
            db: root.join("catalog.db"),
            content: root.join("content"),
            cache: root.join("thumbnails"),
        }
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 90, 30, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_import_and_get() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let png = write_png(&incoming, "sunset.png", 6, 4);

        let imported = library.import_image(&png).unwrap().unwrap();

        assert_eq!(imported.key, "sunset.png");
        assert_eq!(imported.title, "sunset");
        assert_eq!(imported.file_name, "sunset.png");
        assert_eq!(imported.media_type, "image/png");
        assert_eq!(imported.descriptor.width, 6);
        assert_eq!(imported.descriptor.height, 4);
        assert_eq!(imported.file_status, "exists");
        assert!(Path::new(&imported.content_path).exists());

        let fetched = library.get_image("sunset.png").unwrap();
        assert_eq!(fetched, imported);
        assert_eq!(library.image_count().unwrap(), 1);
    }

    #[test]
    fn test_import_skips_duplicates() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let png = write_png(&incoming, "dupe.png", 2, 2);

        assert!(library.import_image(&png).unwrap().is_some());
        assert!(library.import_image(&png).unwrap().is_none());
        assert_eq!(library.image_count().unwrap(), 1);
    }

    #[test]
    fn test_update_image_info_changes_title_only() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let png = write_png(&incoming, "pier.png", 3, 3);

        let mut imported = library.import_image(&png).unwrap().unwrap();
        imported.title = "Evening Pier".to_string();

        let updated = library.update_image_info(&imported).unwrap();

        assert_eq!(updated.title, "Evening Pier");
        assert_eq!(updated.content_path, imported.content_path);
        assert_eq!(updated.media_type, imported.media_type);

        let fetched = library.get_image("pier.png").unwrap();
        assert_eq!(fetched.title, "Evening Pier");
    }

    #[test]
    fn test_update_unknown_image_fails() {
        let paths = temp_paths();
        let library = Library::open(paths).unwrap();

        let ghost = ImageResource {
            id: 99,
            key: "ghost.png".to_string(),
            title: "Ghost".to_string(),
            file_name: "ghost.png".to_string(),
            media_type: "image/png".to_string(),
            content_path: "/nowhere/ghost.png".to_string(),
            descriptor: ImageDescriptor::default(),
            file_status: "exists".to_string(),
            thumbnail_path: None,
        };

        assert!(matches!(
            library.update_image_info(&ghost),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[test]
    fn test_replace_content_versions_and_cleans_up() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let original = write_png(&incoming, "city.png", 2, 2);
        let replacement = write_png(&incoming, "city-night.png", 5, 7);

        let imported = library.import_image(&original).unwrap().unwrap();
        let replaced = library.replace_content("city.png", &replacement).unwrap();

        assert_eq!(replaced.key, "city.png");
        assert_ne!(replaced.content_path, imported.content_path);
        assert!(Path::new(&replaced.content_path).exists());
        assert!(!Path::new(&imported.content_path).exists());
        assert_eq!(replaced.file_name, "city-night.png");
        assert_eq!(replaced.descriptor.width, 5);
        assert_eq!(replaced.descriptor.height, 7);
        assert!(replaced.thumbnail_path.is_some());
    }

    #[test]
    fn test_replace_content_rejects_non_image() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let png = write_png(&incoming, "intact.png", 2, 2);

        let imported = library.import_image(&png).unwrap().unwrap();

        let bogus = incoming.join("payload.png");
        std::fs::write(&bogus, b"html pretending to be an image").unwrap();

        assert!(library.replace_content("intact.png", &bogus).is_err());

        // The stored content is untouched by the failed replacement
        let fetched = library.get_image("intact.png").unwrap();
        assert_eq!(fetched.content_path, imported.content_path);
        assert!(Path::new(&fetched.content_path).exists());
    }

    #[test]
    fn test_verify_content_marks_missing() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let png = write_png(&incoming, "lost.png", 2, 2);

        let imported = library.import_image(&png).unwrap().unwrap();
        std::fs::remove_file(&imported.content_path).unwrap();

        assert_eq!(library.verify_content().unwrap(), 1);

        let fetched = library.get_image("lost.png").unwrap();
        assert!(fetched.is_missing());
    }

    #[test]
    fn test_pending_thumbnails_lifecycle() {
        let paths = temp_paths();
        let incoming = paths.db.parent().unwrap().join("incoming");
        let library = Library::open(paths).unwrap();
        let png = write_png(&incoming, "beach.png", 4, 4);

        library.import_image(&png).unwrap().unwrap();

        let pending = library.get_pending_thumbnails(10).unwrap();
        assert_eq!(pending.len(), 1);

        assert!(library.generate_thumbnail_for(&pending[0]).unwrap());
        assert!(library.get_pending_thumbnails(10).unwrap().is_empty());

        let fetched = library.get_image("beach.png").unwrap();
        assert!(fetched.thumbnail_path.is_some());
        assert!(Path::new(fetched.thumbnail_path.as_ref().unwrap()).exists());
    }

    #[tokio::test]
    async fn test_download_content_async_missing_source() {
        let dest = std::env::temp_dir().join("image-vault-download-test.png");
        let result = download_content_async("/nonexistent/content.png".to_string(), dest).await;
        assert!(result.is_err());
    }
}
