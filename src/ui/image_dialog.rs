/// Modal details dialog for a single image: rename, replace content,
/// download, or close without saving.
///
/// The dialog is a pure state machine: every user interaction and every
/// collaborator completion arrives as a `DialogEvent`, and all I/O the
/// dialog needs is handed back to the host as a `DialogAction`. The host
/// runs the persistence call or opens the replacement sub-flow, then feeds
/// the outcome back in as another event.

use iced::widget::{button, column, container, row, text, text_input, Space};
use iced::{Alignment, Element, Length};
use std::path::Path;

use super::error_state::{ErrorStatePolicy, FieldState, FormContext};
use crate::state::data::ImageResource;

/// A location pointer to the image content currently shown in the preview.
/// Recomputed whenever the held resource changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRef {
    pub path: String,
}

/// Events the dialog reacts to: direct user interaction plus completion
/// callbacks for the work the host ran on the dialog's behalf.
#[derive(Debug, Clone)]
pub enum DialogEvent {
    TitleChanged(String),
    Save,
    Cancel,
    Download,
    Export,
    Replace,
    /// Outcome of the persistence call requested by `SaveImage`
    SaveResult(Result<ImageResource, String>),
    /// Outcome of the replacement sub-flow: the updated resource, or None
    /// when the user cancelled it
    ReplaceResult(Option<ImageResource>),
}

/// Effects the host must perform in response to an event
#[derive(Debug, Clone, PartialEq)]
pub enum DialogAction {
    None,
    /// Persist the updated metadata, then feed back `SaveResult`
    SaveImage(ImageResource),
    /// Copy the image content to a user-chosen destination; fire and forget
    DownloadImage(ImageResource),
    /// Open the content-replacement modal, then feed back `ReplaceResult`
    OpenReplaceFlow(ImageResource),
    /// Dismiss the dialog; the payload is the changed signal for the opener:
    /// true if metadata was saved or content was replaced this session
    Close(bool),
}

pub struct ImageDialog {
    /// The most recently confirmed resource: the one passed at open time,
    /// or the one returned by a completed replacement sub-flow
    image: ImageResource,
    /// Fixed at open time; disables all editable fields
    readonly: bool,
    title: FieldState,
    policy: ErrorStatePolicy,
    form: FormContext,
    /// Content was replaced at least once this session
    image_changed: bool,
    /// A metadata save is in flight
    saving: bool,
    /// The replacement sub-flow is open
    replace_pending: bool,
    preview: PreviewRef,
}

impl ImageDialog {
    /// Open the dialog for an image.
    ///
    /// The title field is seeded from the resource before the read-only
    /// disable is applied, so the seeded value survives.
    pub fn open(image: ImageResource, readonly: bool) -> Self {
        let mut title = FieldState::seeded(image.title.clone());
        if readonly {
            title.disabled = true;
        }

        let preview = PreviewRef {
            path: image.content_path.clone(),
        };

        ImageDialog {
            image,
            readonly,
            title,
            policy: ErrorStatePolicy::default(),
            form: FormContext::default(),
            image_changed: false,
            saving: false,
            replace_pending: false,
            preview,
        }
    }

    pub fn update(&mut self, event: DialogEvent) -> DialogAction {
        match event {
            DialogEvent::TitleChanged(value) => {
                self.title.input(value);
                DialogAction::None
            }
            DialogEvent::Download => DialogAction::DownloadImage(self.image.clone()),
            DialogEvent::Export => {
                // TODO: export as a bundle (content + metadata sidecar);
                // the action stays a placeholder until that format is settled
                DialogAction::None
            }
            DialogEvent::Replace => {
                // At most one sub-flow per dialog; the trigger is also
                // disabled in the view while one is pending
                if self.replace_pending {
                    return DialogAction::None;
                }
                self.replace_pending = true;
                DialogAction::OpenReplaceFlow(self.image.clone())
            }
            DialogEvent::ReplaceResult(Some(updated)) => {
                self.replace_pending = false;
                self.image_changed = true;
                self.preview = PreviewRef {
                    path: updated.content_path.clone(),
                };
                self.image = updated;
                // The title field keeps any in-progress edit; it is not
                // re-seeded from the replaced resource
                DialogAction::None
            }
            DialogEvent::ReplaceResult(None) => {
                self.replace_pending = false;
                DialogAction::None
            }
            DialogEvent::Cancel => DialogAction::Close(self.image_changed),
            DialogEvent::Save => {
                if self.saving {
                    return DialogAction::None;
                }
                self.form.submitted = true;
                if !self.title.is_valid() {
                    // No persistence call; the violation shows through the
                    // error-state policy, nothing is raised here
                    return DialogAction::None;
                }
                self.saving = true;
                let mut updated = self.image.clone();
                updated.title = self.title.value.clone();
                DialogAction::SaveImage(updated)
            }
            DialogEvent::SaveResult(Ok(_)) => DialogAction::Close(true),
            DialogEvent::SaveResult(Err(_)) => {
                // Stay open; the host surfaces the failure. submitted stays
                // true so field errors remain visible
                self.saving = false;
                DialogAction::None
            }
        }
    }

    pub fn image(&self) -> &ImageResource {
        &self.image
    }

    pub fn readonly(&self) -> bool {
        self.readonly
    }

    pub fn preview(&self) -> &PreviewRef {
        &self.preview
    }

    pub fn changed(&self) -> bool {
        self.image_changed
    }

    pub fn submitted(&self) -> bool {
        self.form.submitted
    }

    pub fn title_value(&self) -> &str {
        &self.title.value
    }

    /// Whether the title field should render as invalid
    pub fn title_error(&self) -> bool {
        self.policy.is_error_state(&self.title, &self.form)
    }

    pub fn view(&self) -> Element<'_, DialogEvent> {
        let heading = text(format!("Image: {}", self.image.file_name)).size(20);

        let details = text(format!(
            "{} · {}×{} px",
            self.image.media_type, self.image.descriptor.width, self.image.descriptor.height
        ))
        .size(13);

        let preview: Element<'_, DialogEvent> = if Path::new(&self.preview.path).exists() {
            iced::widget::image(iced::widget::image::Handle::from_path(&self.preview.path))
                .width(Length::Fixed(360.0))
                .into()
        } else {
            container(text("Preview unavailable").size(14))
                .center_x(Length::Fixed(360.0))
                .center_y(Length::Fixed(200.0))
                .into()
        };

        let mut title_input = text_input("Title", &self.title.value).padding(10).size(16);
        if !self.title.disabled {
            title_input = title_input
                .on_input(DialogEvent::TitleChanged)
                .on_submit(DialogEvent::Save);
        }

        let error_hint: Element<'_, DialogEvent> = if self.title_error() {
            text("Title is required.").size(12).style(text::danger).into()
        } else {
            Space::with_height(Length::Shrink).into()
        };

        let mut tools = row![
            button(text("Download").size(14))
                .on_press(DialogEvent::Download)
                .style(button::secondary)
                .padding(8),
            button(text("Export").size(14))
                .on_press(DialogEvent::Export)
                .style(button::secondary)
                .padding(8),
        ]
        .spacing(8);
        if !self.readonly {
            tools = tools.push(
                button(text("Replace image").size(14))
                    .on_press_maybe((!self.replace_pending).then_some(DialogEvent::Replace))
                    .style(button::secondary)
                    .padding(8),
            );
        }

        let mut controls = row![Space::with_width(Length::Fill)].spacing(8);
        controls = controls.push(
            button(text("Cancel").size(14))
                .on_press(DialogEvent::Cancel)
                .style(button::secondary)
                .padding(8),
        );
        if !self.readonly {
            controls = controls.push(
                button(text(if self.saving { "Saving…" } else { "Save" }).size(14))
                    .on_press_maybe((!self.saving).then_some(DialogEvent::Save))
                    .style(button::primary)
                    .padding(8),
            );
        }

        let mut body = column![heading, details, preview, title_input, error_hint]
            .spacing(12)
            .align_x(Alignment::Start);
        if self.readonly {
            body = body.push(text("This image is read-only.").size(12));
        }
        body = body.push(tools).push(controls);

        container(body)
            .padding(24)
            .width(Length::Fixed(440.0))
            .style(container::rounded_box)
            .into()
    }
}
