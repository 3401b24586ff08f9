use iced::widget::{button, center, column, container, opaque, row, scrollable, stack, text, Space};
use iced::{Alignment, Color, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use walkdir::WalkDir;

mod content;
mod state;
mod ui;

use state::data::ImageResource;
use state::library::{self, Library, StorePaths};
use ui::image_dialog::{DialogAction, DialogEvent, ImageDialog};
use ui::upload_dialog::{UploadAction, UploadEvent, UploadDialog};

/// Result of a folder import operation
#[derive(Debug, Clone)]
struct ImportResult {
    imported_count: usize,
    skipped_count: usize,
}

/// Main application state
struct ImageVault {
    /// The catalog database and content store
    library: Library,
    /// Cached gallery rows
    images: Vec<ImageResource>,
    /// Status message to display to the user
    status: String,
    /// The image details dialog, when open
    dialog: Option<ImageDialog>,
    /// The content-replacement sub-flow, when open
    upload: Option<UploadDialog>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Import Folder" button
    ImportFolder,
    /// Background import completed with results
    ImportComplete(ImportResult),
    /// Background thumbnail generation finished
    ThumbnailsGenerated(usize),
    /// User clicked an image card in the gallery
    OpenImage(String),
    /// Event for the image details dialog
    Dialog(DialogEvent),
    /// Event for the content-replacement sub-flow
    Upload(UploadEvent),
    /// Background download (save-as) finished
    DownloadComplete(Result<String, String>),
}

impl ImageVault {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        // If this fails, we panic because the app cannot function without its database
        let library =
            Library::new().expect("Failed to initialize database. Check permissions and disk space.");

        let missing = library.verify_content().unwrap_or(0);
        if missing > 0 {
            println!("⚠️  {} images have missing content files", missing);
        }

        let images = library.get_all_images().unwrap_or_default();
        println!("🖼️  Image Vault initialized with {} images", images.len());

        let status = format!("Ready. {} images in library.", images.len());
        let paths = library.paths().clone();

        (
            ImageVault {
                library,
                images,
                status,
                dialog: None,
                upload: None,
            },
            Task::perform(
                library::generate_pending_thumbnails_async(paths),
                Message::ThumbnailsGenerated,
            ),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImportFolder => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Images")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.status = format!("Importing from {}...", folder_path.display());
                    let paths = self.library.paths().clone();

                    return Task::perform(
                        import_folder_async(folder_path, paths),
                        Message::ImportComplete,
                    );
                }

                Task::none()
            }
            Message::ImportComplete(result) => {
                self.status = format!(
                    "✅ Import complete! Added {} images, skipped {} duplicates.",
                    result.imported_count, result.skipped_count
                );
                self.refresh();

                let paths = self.library.paths().clone();
                Task::perform(
                    library::generate_pending_thumbnails_async(paths),
                    Message::ThumbnailsGenerated,
                )
            }
            Message::ThumbnailsGenerated(count) => {
                if count > 0 {
                    self.refresh();
                }
                Task::none()
            }
            Message::OpenImage(key) => {
                match self.library.get_image(&key) {
                    Ok(image) => {
                        // Images whose content file vanished open read-only
                        let readonly = image.is_missing();
                        self.dialog = Some(ImageDialog::open(image, readonly));
                    }
                    Err(e) => self.status = format!("⚠️  {}", e),
                }
                Task::none()
            }
            Message::Dialog(event) => {
                // Persistence failures surface on the status line; the dialog
                // itself only stays open
                if let DialogEvent::SaveResult(Err(e)) = &event {
                    self.status = format!("⚠️  Failed to save image: {}", e);
                }

                let Some(dialog) = self.dialog.as_mut() else {
                    return Task::none();
                };

                match dialog.update(event) {
                    DialogAction::None => Task::none(),
                    DialogAction::SaveImage(image) => {
                        let paths = self.library.paths().clone();
                        Task::perform(library::update_image_info_async(paths, image), |result| {
                            Message::Dialog(DialogEvent::SaveResult(result))
                        })
                    }
                    DialogAction::DownloadImage(image) => self.start_download(image),
                    DialogAction::OpenReplaceFlow(image) => {
                        self.upload = Some(UploadDialog::open(image));
                        Task::none()
                    }
                    DialogAction::Close(changed) => {
                        // The sub-flow dies with the dialog, so a late
                        // completion has nowhere to land
                        self.dialog = None;
                        self.upload = None;

                        if changed {
                            self.refresh();
                            self.status = format!("Ready. {} images in library.", self.images.len());
                        }
                        Task::none()
                    }
                }
            }
            Message::Upload(event) => {
                let Some(upload) = self.upload.as_mut() else {
                    return Task::none();
                };

                match upload.update(event) {
                    UploadAction::None => Task::none(),
                    UploadAction::Commit { key, source } => {
                        let paths = self.library.paths().clone();
                        Task::perform(
                            library::replace_content_async(paths, key, source),
                            |result| Message::Upload(UploadEvent::Completed(result)),
                        )
                    }
                    UploadAction::Close(result) => {
                        self.upload = None;
                        if let Some(dialog) = self.dialog.as_mut() {
                            let _ = dialog.update(DialogEvent::ReplaceResult(result));
                        }
                        Task::none()
                    }
                }
            }
            Message::DownloadComplete(Ok(dest)) => {
                self.status = format!("✅ Saved image to {}", dest);
                Task::none()
            }
            Message::DownloadComplete(Err(e)) => {
                self.status = format!("⚠️  Download failed: {}", e);
                Task::none()
            }
        }
    }

    /// Ask for a destination and copy the image content there
    fn start_download(&mut self, image: ImageResource) -> Task<Message> {
        let dest = FileDialog::new()
            .set_title("Save Image As")
            .set_file_name(&image.file_name)
            .save_file();

        match dest {
            Some(dest) => {
                self.status = format!("Saving {}...", image.file_name);
                Task::perform(
                    library::download_content_async(image.content_path, dest),
                    Message::DownloadComplete,
                )
            }
            None => Task::none(),
        }
    }

    /// Re-read the gallery rows from the catalog
    fn refresh(&mut self) {
        self.images = self.library.get_all_images().unwrap_or_default();
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let base = self.gallery_view();

        let Some(dialog) = &self.dialog else {
            return base;
        };
        let dialog_layer = modal_overlay(dialog.view().map(Message::Dialog));

        match &self.upload {
            Some(upload) => stack![
                base,
                dialog_layer,
                modal_overlay(upload.view().map(Message::Upload))
            ]
            .into(),
            None => stack![base, dialog_layer].into(),
        }
    }

    fn gallery_view(&self) -> Element<Message> {
        let header = row![
            text("Image Vault").size(28),
            Space::with_width(Length::Fill),
            button("Import Folder")
                .on_press(Message::ImportFolder)
                .padding(10),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let grid: Element<Message> = if self.images.is_empty() {
            text("No images yet. Import a folder to get started.")
                .size(16)
                .into()
        } else {
            let cards: Vec<Element<Message>> =
                self.images.iter().map(|image| self.image_card(image)).collect();
            iced_aw::Wrap::with_elements(cards)
                .spacing(16.0)
                .line_spacing(16.0)
                .into()
        };

        let body = column![
            header,
            scrollable(container(grid).width(Length::Fill).padding(10)).height(Length::Fill),
            text(&self.status).size(14),
        ]
        .spacing(20)
        .padding(30);

        container(body)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn image_card<'a>(&self, image: &'a ImageResource) -> Element<'a, Message> {
        let thumb: Element<Message> = match &image.thumbnail_path {
            Some(path) => iced::widget::image(iced::widget::image::Handle::from_path(path))
                .width(Length::Fixed(160.0))
                .height(Length::Fixed(160.0))
                .into(),
            None => container(
                text(if image.is_missing() { "missing" } else { "…" }).size(14),
            )
            .center_x(Length::Fixed(160.0))
            .center_y(Length::Fixed(160.0))
            .into(),
        };

        button(
            column![thumb, text(&image.title).size(14)]
                .spacing(8)
                .align_x(Alignment::Center)
                .width(Length::Fixed(160.0)),
        )
        .on_press(Message::OpenImage(image.key.clone()))
        .style(button::text)
        .padding(8)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Dim the layers underneath and center the modal content on top
fn modal_overlay(content: Element<Message>) -> Element<Message> {
    opaque(center(opaque(content)).style(|_theme| container::Style {
        background: Some(
            Color {
                a: 0.7,
                ..Color::BLACK
            }
            .into(),
        ),
        ..container::Style::default()
    }))
}

fn main() -> iced::Result {
    iced::application("Image Vault", ImageVault::update, ImageVault::view)
        .theme(ImageVault::theme)
        .centered()
        .run_with(ImageVault::new)
}

/// Async function to import all image files from a folder
/// Runs in a background thread to avoid blocking the UI
async fn import_folder_async(folder_path: PathBuf, paths: StorePaths) -> ImportResult {
    tokio::task::spawn_blocking(move || import_folder_blocking(folder_path, paths))
        .await
        .unwrap_or_else(|e| {
            eprintln!("⚠️  Import task failed: {}", e);
            ImportResult {
                imported_count: 0,
                skipped_count: 0,
            }
        })
}

fn import_folder_blocking(folder_path: PathBuf, paths: StorePaths) -> ImportResult {
    let mut imported_count = 0;
    let mut skipped_count = 0;

    // Open a new catalog handle for this background thread
    // rusqlite::Connection is not Send, so we can't share the main connection
    let library = match Library::open(paths) {
        Ok(library) => library,
        Err(e) => {
            eprintln!("⚠️  Failed to open library for import: {}", e);
            return ImportResult {
                imported_count,
                skipped_count,
            };
        }
    };

    println!("🔍 Scanning folder: {}", folder_path.display());

    // Walk the directory tree recursively
    for entry in WalkDir::new(&folder_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Only process files (not directories)
        if !path.is_file() {
            continue;
        }

        // Cheap extension filter first; the import probes the actual content
        let Some(extension) = path.extension() else {
            continue;
        };
        let ext = extension.to_string_lossy().to_lowercase();
        if !content::store::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        match library.import_image(path) {
            Ok(Some(_)) => {
                imported_count += 1;
                if imported_count % 100 == 0 {
                    println!("⏳ Imported {} files...", imported_count);
                }
            }
            Ok(None) => skipped_count += 1,
            Err(e) => eprintln!("⚠️  Error importing {}: {}", path.display(), e),
        }
    }

    println!(
        "✅ Import complete: {} new, {} skipped",
        imported_count, skipped_count
    );

    ImportResult {
        imported_count,
        skipped_count,
    }
}
