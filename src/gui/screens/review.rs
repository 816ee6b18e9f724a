use iced::{
    Alignment::Center,
    Element, Length, Task,
    widget::{button, canvas, column, image::Handle, row, slider, text, toggler},
};
use rfd::{AsyncMessageDialog, MessageButtons, MessageLevel};

use crate::enhance::{self, Adjustments};
use crate::gui::{
    AppState,
    screens::{Screen, ScreenMessage},
    widgets::{
        image_list, layout,
        scene::{BoxRef, Layers, Scene, SceneMessage},
        viewport::Viewport,
    },
};
use crate::review::ReviewItem;

/// Navigates the disagreeing images and edits their decisions
#[derive(Debug, Clone)]
pub struct ReviewScreen {
    index: usize,
    layers: Layers,
    adjustments: Adjustments,
    viewport: Viewport,
    handle: Option<Handle>,
    status: String,
}

#[derive(Debug, Clone)]
pub enum ReviewMessage {
    Scene(SceneMessage),
    ShowPredictions(bool),
    ShowGroundTruth(bool),
    ShowFinal(bool),
    Brightness(u32),
    Contrast(u32),
    Preview,
    Save,
    Saved(Result<usize, String>),
    Previous,
    Next,
    Select(usize),
    None,
}

#[derive(Debug, Clone)]
pub enum ReviewParentMessage {
    Exit,
}

impl ReviewScreen {
    pub fn new(state: &AppState) -> Self {
        let mut screen = Self {
            index: 0,
            layers: Layers::default(),
            adjustments: Adjustments::default(),
            viewport: Viewport::default(),
            handle: None,
            status: String::new(),
        };
        screen.refresh_image(state);
        screen
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn current<'a>(&self, state: &'a AppState) -> Option<&'a ReviewItem> {
        state.session.items.get(self.index)
    }

    /// Re-render the background with the current adjustments
    fn refresh_image(&mut self, state: &AppState) {
        self.handle = self.current(state).map(|item| {
            let rgba = self.adjustments.apply(&item.image);
            let (w, h) = rgba.dimensions();
            Handle::from_rgba(w, h, rgba.into_raw())
        });
    }

    fn load(&mut self, index: usize, state: &AppState) {
        if index >= state.session.len() || index == self.index {
            return;
        }
        self.index = index;
        self.viewport = Viewport::default();
        self.refresh_image(state);
        log::debug!("Showing image {} of {}", index + 1, state.session.len());
    }

    fn apply_scene(&mut self, message: SceneMessage, state: &mut AppState) {
        match message {
            SceneMessage::Zoom(factor, offset) => self.viewport.zoom_at(factor, offset),
            SceneMessage::Pan(delta) => self.viewport.pan_by(delta),
            SceneMessage::Toggle(target) => {
                let Some(item) = state.session.items.get_mut(self.index) else { return };
                match target {
                    BoxRef::Prediction(i) => item.toggle_prediction(i),
                    BoxRef::GroundTruth(i) => item.toggle_ground_truth(i),
                }
            }
            SceneMessage::Resize(target, anchor, p) => {
                let Some(item) = state.session.items.get_mut(self.index) else { return };
                match target {
                    BoxRef::Prediction(i) => item.resize_prediction(i, anchor, p.x, p.y),
                    BoxRef::GroundTruth(i) => item.resize_ground_truth(i, anchor, p.x, p.y),
                }
            }
        }
    }

    fn controls(&self) -> Element<'_, ScreenMessage<Self>> {
        let msg = ScreenMessage::ScreenMessage;
        let sliders = row![
            text("Brightness"),
            slider(0..=enhance::MAX, self.adjustments.brightness, move |v| msg(ReviewMessage::Brightness(v))),
            text("Contrast"),
            slider(0..=enhance::MAX, self.adjustments.contrast, move |v| msg(ReviewMessage::Contrast(v))),
        ]
        .spacing(10)
        .align_y(Center);

        let buttons = row![
            toggler(self.layers.predictions)
                .label("Show predictions")
                .on_toggle(move |v| msg(ReviewMessage::ShowPredictions(v))),
            toggler(self.layers.ground_truth)
                .label("Show ground truth")
                .on_toggle(move |v| msg(ReviewMessage::ShowGroundTruth(v))),
            toggler(self.layers.final_labels)
                .label("Show final labels")
                .on_toggle(move |v| msg(ReviewMessage::ShowFinal(v))),
            button("Preview").on_press(msg(ReviewMessage::Preview)),
            button("Save").on_press(msg(ReviewMessage::Save)),
            button("Previous").on_press(msg(ReviewMessage::Previous)),
            button("Next").on_press(msg(ReviewMessage::Next)),
            button("Exit").on_press(ScreenMessage::ParentMessage(ReviewParentMessage::Exit)),
        ]
        .spacing(10)
        .align_y(Center);

        column![sliders, buttons].spacing(8).into()
    }
}

impl Screen for ReviewScreen {
    type Message = ReviewMessage;
    type ParentMessage = ReviewParentMessage;

    fn view<'a>(&'a self, state: &'a AppState) -> Element<'a, ScreenMessage<Self>> {
        let (Some(item), Some(handle)) = (self.current(state), self.handle.as_ref()) else {
            return text("Nothing to review").into();
        };

        let scene: Element<'a, SceneMessage> = canvas(Scene {
            item,
            class_names: &state.session.class_names,
            handle,
            viewport: self.viewport,
            layers: self.layers,
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .into();

        let header = text(format!(
            "Image {} of {}: {}",
            self.index + 1,
            state.session.len(),
            item.image_path.display()
        ));

        let main = column![
            header,
            scene.map(|m| ScreenMessage::ScreenMessage(ReviewMessage::Scene(m))),
            self.controls(),
            text(&self.status).size(13),
        ]
        .spacing(8)
        .padding(10);

        let names = state.session.items.iter().map(|i| {
            i.image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let sidebar = image_list(names, self.index, |idx| {
            ScreenMessage::ScreenMessage(ReviewMessage::Select(idx))
        });

        layout(sidebar, main)
    }

    fn update(
        &mut self,
        message: Self::Message,
        state: &mut AppState,
    ) -> Task<ScreenMessage<Self>> {
        match message {
            ReviewMessage::Scene(scene) => {
                self.apply_scene(scene, state);
                Task::none()
            }
            ReviewMessage::ShowPredictions(v) => {
                self.layers.predictions = v;
                Task::none()
            }
            ReviewMessage::ShowGroundTruth(v) => {
                self.layers.ground_truth = v;
                Task::none()
            }
            ReviewMessage::ShowFinal(v) => {
                self.layers.final_labels = v;
                Task::none()
            }
            ReviewMessage::Brightness(v) => {
                self.adjustments.brightness = v;
                self.refresh_image(state);
                Task::none()
            }
            ReviewMessage::Contrast(v) => {
                self.adjustments.contrast = v;
                self.refresh_image(state);
                Task::none()
            }
            ReviewMessage::Preview => {
                let Some(item) = self.current(state) else { return Task::none() };
                Task::perform(
                    AsyncMessageDialog::new()
                        .set_title("Final Labels")
                        .set_description(item.preview_text())
                        .set_level(MessageLevel::Info)
                        .set_buttons(MessageButtons::Ok)
                        .show(),
                    |_| ScreenMessage::ScreenMessage(ReviewMessage::None),
                )
            }
            ReviewMessage::Save => {
                self.status = "Saving...".to_string();
                Task::perform(state.session.save_job().write_async(), |result| {
                    ScreenMessage::ScreenMessage(ReviewMessage::Saved(
                        result.map_err(|e| format!("{:#}", e)),
                    ))
                })
            }
            ReviewMessage::Saved(result) => {
                self.status = match result {
                    Ok(count) => format!("Saved {} label files", count),
                    Err(e) => {
                        log::error!("Saving failed: {}", e);
                        format!("Saving failed: {}", e)
                    }
                };
                Task::none()
            }
            ReviewMessage::Previous => {
                if self.index > 0 {
                    self.load(self.index - 1, state);
                }
                Task::none()
            }
            ReviewMessage::Next => {
                self.load(self.index + 1, state);
                Task::none()
            }
            ReviewMessage::Select(idx) => {
                self.load(idx, state);
                Task::none()
            }
            ReviewMessage::None => Task::none(),
        }
    }
}
