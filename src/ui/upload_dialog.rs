/// Nested modal that replaces an image's binary content.
///
/// From the details dialog's point of view this is a black box: it closes
/// with the updated resource, or with nothing when the user backs out.
/// The actual content write happens in the host via `UploadAction::Commit`.

use iced::widget::{button, column, container, row, text, Space};
use iced::{Element, Length};
use rfd::FileDialog;
use std::path::PathBuf;

use crate::content::store;
use crate::state::data::ImageResource;

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Browse,
    Confirm,
    Cancel,
    /// Outcome of the content write requested by `Commit`
    Completed(Result<ImageResource, String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadAction {
    None,
    /// Replace the stored content with the selected file, then feed back
    /// `Completed`
    Commit { key: String, source: PathBuf },
    /// Report back to the opener: the updated resource, or None when the
    /// sub-flow was cancelled
    Close(Option<ImageResource>),
}

pub struct UploadDialog {
    image: ImageResource,
    selected: Option<PathBuf>,
    uploading: bool,
    error: Option<String>,
}

impl UploadDialog {
    pub fn open(image: ImageResource) -> Self {
        UploadDialog {
            image,
            selected: None,
            uploading: false,
            error: None,
        }
    }

    /// Take a file selection. The `Browse` event routes the native picker's
    /// choice through here; tests drive it directly.
    pub fn select(&mut self, path: PathBuf) {
        self.error = None;
        self.selected = Some(path);
    }

    pub fn update(&mut self, event: UploadEvent) -> UploadAction {
        match event {
            UploadEvent::Browse => {
                if let Some(path) = FileDialog::new()
                    .set_title("Select Replacement Image")
                    .add_filter("Images", store::IMAGE_EXTENSIONS)
                    .pick_file()
                {
                    self.select(path);
                }
                UploadAction::None
            }
            UploadEvent::Confirm => {
                if self.uploading {
                    return UploadAction::None;
                }
                match &self.selected {
                    Some(source) => {
                        self.uploading = true;
                        self.error = None;
                        UploadAction::Commit {
                            key: self.image.key.clone(),
                            source: source.clone(),
                        }
                    }
                    None => {
                        self.error = Some("Select an image file first.".to_string());
                        UploadAction::None
                    }
                }
            }
            UploadEvent::Cancel => UploadAction::Close(None),
            UploadEvent::Completed(Ok(updated)) => UploadAction::Close(Some(updated)),
            UploadEvent::Completed(Err(e)) => {
                // Stay open so the user can pick another file
                self.uploading = false;
                self.error = Some(e);
                UploadAction::None
            }
        }
    }

    pub fn view(&self) -> Element<'_, UploadEvent> {
        let heading = text(format!("Replace image: {}", self.image.file_name)).size(20);

        let selected: Element<'_, UploadEvent> = match &self.selected {
            Some(path) => text(format!("Selected: {}", path.display())).size(14).into(),
            None => text("No file selected.").size(14).into(),
        };

        let error_hint: Element<'_, UploadEvent> = match &self.error {
            Some(e) => text(e.as_str()).size(13).style(text::danger).into(),
            None => Space::with_height(Length::Shrink).into(),
        };

        let browse = button(text("Browse…").size(14))
            .on_press(UploadEvent::Browse)
            .style(button::secondary)
            .padding(8);

        let controls = row![
            Space::with_width(Length::Fill),
            button(text("Cancel").size(14))
                .on_press(UploadEvent::Cancel)
                .style(button::secondary)
                .padding(8),
            button(text(if self.uploading { "Replacing…" } else { "Replace" }).size(14))
                .on_press_maybe(
                    (!self.uploading && self.selected.is_some()).then_some(UploadEvent::Confirm)
                )
                .style(button::primary)
                .padding(8),
        ]
        .spacing(8);

        container(column![heading, selected, browse, error_hint, controls].spacing(12))
            .padding(24)
            .width(Length::Fixed(420.0))
            .style(container::rounded_box)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::ImageDescriptor;

    fn sample_image() -> ImageResource {
        ImageResource {
            id: 7,
            key: "meadow.png".to_string(),
            title: "Meadow".to_string(),
            file_name: "meadow.png".to_string(),
            media_type: "image/png".to_string(),
            content_path: "/store/content/meadow.png-100.png".to_string(),
            descriptor: ImageDescriptor::default(),
            file_status: "exists".to_string(),
            thumbnail_path: None,
        }
    }

    #[test]
    fn test_confirm_without_selection_shows_error() {
        let mut dialog = UploadDialog::open(sample_image());

        let action = dialog.update(UploadEvent::Confirm);

        assert_eq!(action, UploadAction::None);
        assert!(dialog.error.is_some());
    }

    #[test]
    fn test_confirm_commits_selected_file() {
        let mut dialog = UploadDialog::open(sample_image());
        dialog.select(PathBuf::from("/pictures/meadow-spring.png"));

        let action = dialog.update(UploadEvent::Confirm);

        assert_eq!(
            action,
            UploadAction::Commit {
                key: "meadow.png".to_string(),
                source: PathBuf::from("/pictures/meadow-spring.png"),
            }
        );

        // A second confirm while the write is in flight does nothing
        assert_eq!(dialog.update(UploadEvent::Confirm), UploadAction::None);
    }

    #[test]
    fn test_completed_success_closes_with_resource() {
        let mut dialog = UploadDialog::open(sample_image());
        dialog.select(PathBuf::from("/pictures/meadow-spring.png"));
        dialog.update(UploadEvent::Confirm);

        let updated = ImageResource {
            content_path: "/store/content/meadow.png-200.png".to_string(),
            ..sample_image()
        };
        let action = dialog.update(UploadEvent::Completed(Ok(updated.clone())));

        assert_eq!(action, UploadAction::Close(Some(updated)));
    }

    #[test]
    fn test_completed_failure_keeps_dialog_open() {
        let mut dialog = UploadDialog::open(sample_image());
        dialog.select(PathBuf::from("/downloads/definitely-a-virus.png"));
        dialog.update(UploadEvent::Confirm);

        let action = dialog.update(UploadEvent::Completed(Err(
            "file is not a supported image format".to_string(),
        )));

        assert_eq!(action, UploadAction::None);
        assert!(dialog.error.is_some());

        // Picking a new file clears the error and can be confirmed again
        dialog.select(PathBuf::from("/pictures/actual-photo.png"));
        assert!(dialog.error.is_none());
        assert!(matches!(
            dialog.update(UploadEvent::Confirm),
            UploadAction::Commit { .. }
        ));
    }

    #[test]
    fn test_cancel_closes_with_nothing() {
        let mut dialog = UploadDialog::open(sample_image());
        dialog.select(PathBuf::from("/pictures/meadow-spring.png"));

        // Cancelling is not an error, even with a selection staged
        assert_eq!(dialog.update(UploadEvent::Cancel), UploadAction::Close(None));
    }
}
