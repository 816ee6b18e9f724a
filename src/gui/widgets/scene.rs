use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::widget::image::Handle;
use iced::{Color, Event, Pixels, Point, Rectangle, Renderer, Size, Theme, Vector, mouse};

use crate::geometry::BoundingBox;
use crate::review::{ReviewItem, class_name};

use super::viewport::Viewport;

/// Grab distance of the resize handles, in image pixels
pub const HANDLE_SIZE: f32 = 10.0;

const PREDICTION: Color = Color::from_rgb(1.0, 0.0, 0.0);
const FLAGGED: Color = Color::from_rgb(1.0, 191.0 / 255.0, 0.0);
const GROUND_TRUTH: Color = Color::from_rgb(0.0, 0.5, 0.0);
const FINAL: Color = Color::from_rgb(0.0, 0.0, 1.0);
const INACTIVE: Color = Color::from_rgb(0.5, 0.5, 0.5);
const ACCEPTED: Color = Color::from_rgb(0.0, 0.5, 0.0);
const LABEL_SIZE: f32 = 14.0;

/// A box on the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxRef {
    Prediction(usize),
    GroundTruth(usize),
}

/// Messages emitted by the scene
#[derive(Debug, Clone, PartialEq)]
pub enum SceneMessage {
    Toggle(BoxRef),
    /// Span the box from a fixed image-space anchor to an image-space point
    Resize(BoxRef, (f32, f32), Point),
    /// Zoom by a factor around an offset from the canvas centre
    Zoom(f32, Vector),
    Pan(Vector),
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Interaction {
    #[default]
    None,
    /// Dragging a corner; the opposite corner is held at the anchor
    Resizing(BoxRef, (f32, f32)),
    Panning(Point),
}

/// Layer visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layers {
    pub predictions: bool,
    pub ground_truth: bool,
    pub final_labels: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            predictions: true,
            ground_truth: true,
            final_labels: false,
        }
    }
}

/// Canvas program drawing one review item
pub struct Scene<'a> {
    pub item: &'a ReviewItem,
    pub class_names: &'a [String],
    pub handle: &'a Handle,
    pub viewport: Viewport,
    pub layers: Layers,
}

impl Scene<'_> {
    fn image_size(&self) -> Size {
        let (w, h) = self.item.dimensions();
        Size::new(w as f32, h as f32)
    }

    fn boxes(&self) -> Vec<(BoxRef, BoundingBox)> {
        let mut boxes = Vec::new();
        if self.layers.predictions {
            boxes.extend(
                (0..self.item.predictions.len())
                    .filter_map(|i| self.item.prediction_box(i).map(|b| (BoxRef::Prediction(i), b))),
            );
        }
        // drawn last, so hit first
        if self.layers.ground_truth {
            boxes.extend(
                (0..self.item.ground_truth.len())
                    .filter_map(|i| self.item.ground_truth_box(i).map(|b| (BoxRef::GroundTruth(i), b))),
            );
        }
        boxes
    }

    /// Topmost box under an image-space point. When a corner handle is
    /// grabbed, also the anchor that stays fixed while dragging it.
    fn hit(&self, p: Point) -> Option<(BoxRef, Option<(f32, f32)>)> {
        let boxes = self.boxes();
        if let Some((target, anchor)) = boxes
            .iter()
            .rev()
            .find_map(|(r, b)| b.hit_corner(p.x, p.y, HANDLE_SIZE).map(|c| (*r, b.anchor(c))))
        {
            return Some((target, Some(anchor)));
        }
        boxes
            .iter()
            .rev()
            .find(|(_, b)| b.contains(p.x, p.y))
            .map(|(r, _)| (*r, None))
    }

    fn to_rect(b: &BoundingBox) -> Rectangle {
        let b = b.normalized();
        Rectangle::new(Point::new(b.x, b.y), Size::new(b.width, b.height))
    }

    fn draw_box(&self, frame: &mut Frame, bounds: Size, bbox: &BoundingBox, color: Color) -> Rectangle {
        let rect = self
            .viewport
            .rect_to_screen(bounds, self.image_size(), Self::to_rect(bbox));
        frame.stroke(
            &Path::rectangle(rect.position(), rect.size()),
            Stroke::default().with_width(2.0).with_color(color),
        );
        rect
    }

    fn draw_label(frame: &mut Frame, position: Point, content: String, color: Color) {
        let width = content.chars().count() as f32 * LABEL_SIZE * 0.6 + 4.0;
        let top_left = position - Vector::new(0.0, LABEL_SIZE + 6.0);
        frame.fill_rectangle(top_left, Size::new(width, LABEL_SIZE + 4.0), Color::WHITE);
        frame.fill_text(Text {
            content,
            position: top_left + Vector::new(2.0, 2.0),
            color,
            size: Pixels(LABEL_SIZE),
            ..Text::default()
        });
    }
}

impl canvas::Program<SceneMessage> for Scene<'_> {
    type State = Interaction;

    fn update(
        &self,
        interaction: &mut Interaction,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<SceneMessage>> {
        if let Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) = event {
            *interaction = Interaction::None;
            return None;
        }

        let position = cursor.position_in(bounds)?;
        let image_point = self
            .viewport
            .to_image(bounds.size(), self.image_size(), position);

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => match self.hit(image_point) {
                Some((target, Some(anchor))) => {
                    *interaction = Interaction::Resizing(target, anchor);
                    Some(canvas::Action::capture())
                }
                Some((target, None)) => {
                    Some(canvas::Action::publish(SceneMessage::Toggle(target)).and_capture())
                }
                None => {
                    *interaction = Interaction::Panning(position);
                    Some(canvas::Action::capture())
                }
            },
            Event::Mouse(mouse::Event::CursorMoved { .. }) => match *interaction {
                Interaction::Resizing(target, anchor) => Some(
                    canvas::Action::publish(SceneMessage::Resize(target, anchor, image_point))
                        .and_capture(),
                ),
                Interaction::Panning(last) => {
                    *interaction = Interaction::Panning(position);
                    Some(canvas::Action::publish(SceneMessage::Pan(position - last)).and_capture())
                }
                Interaction::None => None,
            },
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let y = match delta {
                    mouse::ScrollDelta::Lines { y, .. } | mouse::ScrollDelta::Pixels { y, .. } => *y,
                };
                if y == 0.0 {
                    return None;
                }
                let factor = if y > 0.0 { 1.25 } else { 0.8 };
                let centre = Point::new(bounds.width / 2.0, bounds.height / 2.0);
                Some(canvas::Action::publish(SceneMessage::Zoom(factor, position - centre)).and_capture())
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _interaction: &Interaction,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let size = bounds.size();
        let image_size = self.image_size();

        let image_rect = self.viewport.rect_to_screen(
            size,
            image_size,
            Rectangle::new(Point::ORIGIN, image_size),
        );
        frame.draw_image(image_rect, canvas::Image::new(self.handle.clone()));

        if self.layers.predictions {
            let flags = self.item.flag_predictions();
            for (idx, state) in self.item.predictions.iter().enumerate() {
                let Some(bbox) = self.item.prediction_box(idx) else { continue };
                let color = if flags.get(idx).copied().unwrap_or(false) { FLAGGED } else { PREDICTION };
                let rect = self.draw_box(&mut frame, size, &bbox, color);
                let name = class_name(self.class_names, state.label.class_id);
                Self::draw_label(&mut frame, rect.position(), format!("{}:{:.2}", name, state.confidence), Color::BLACK);
                let mark = if state.accepted { ACCEPTED } else { INACTIVE };
                Self::draw_label(&mut frame, Point::new(rect.x + rect.width + 2.0, rect.y), "✓".to_string(), mark);
            }
        }

        if self.layers.ground_truth {
            for (idx, state) in self.item.ground_truth.iter().enumerate() {
                let Some(bbox) = self.item.ground_truth_box(idx) else { continue };
                let rect = self.draw_box(&mut frame, size, &bbox, GROUND_TRUTH);
                let name = class_name(self.class_names, state.label.class_id);
                Self::draw_label(&mut frame, rect.position(), name, Color::BLACK);
                let mark = if state.kept { PREDICTION } else { INACTIVE };
                Self::draw_label(&mut frame, Point::new(rect.x + rect.width + 2.0, rect.y), "✗".to_string(), mark);
            }
        }

        if self.layers.final_labels {
            let (w, h) = self.item.dimensions();
            for label in self.item.final_labels() {
                let bbox = BoundingBox::from_label(&label, w, h);
                let rect = self.draw_box(&mut frame, size, &bbox, FINAL);
                Self::draw_label(&mut frame, rect.position(), class_name(self.class_names, label.class_id), FINAL);
            }
        }

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        interaction: &Interaction,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        match interaction {
            Interaction::Resizing(..) => mouse::Interaction::Crosshair,
            Interaction::Panning(_) => mouse::Interaction::Grabbing,
            Interaction::None => {
                let Some(position) = cursor.position_in(bounds) else {
                    return mouse::Interaction::default();
                };
                let p = self.viewport.to_image(bounds.size(), self.image_size(), position);
                match self.hit(p) {
                    Some((_, Some(_))) => mouse::Interaction::Crosshair,
                    Some((_, None)) => mouse::Interaction::Pointer,
                    None => mouse::Interaction::Grab,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::path::PathBuf;

    fn item(prediction: &str, ground_truth: &str) -> ReviewItem {
        ReviewItem::new(
            PathBuf::from("img.png"),
            DynamicImage::new_rgb8(100, 100),
            PathBuf::from("img.txt"),
            vec![prediction.parse().unwrap()],
            [ground_truth.parse::<crate::label::YoloLabel>().unwrap()],
        )
    }

    fn scene<'a>(item: &'a ReviewItem, handle: &'a Handle, layers: Layers) -> Scene<'a> {
        Scene {
            item,
            class_names: &[],
            handle,
            viewport: Viewport::default(),
            layers,
        }
    }

    #[test]
    fn corner_handle_wins_over_box_on_top() {
        // prediction x 50..60 sits inside ground truth x 30..70
        let item = item("0 0.55 0.55 0.1 0.1 0.9", "1 0.5 0.5 0.4 0.4");
        let handle = Handle::from_rgba(1, 1, vec![0u8; 4]);
        let scene = scene(&item, &handle, Layers::default());

        let (target, anchor) = scene.hit(Point::new(50.5, 50.5)).unwrap();
        assert_eq!(target, BoxRef::Prediction(0));
        let (ax, ay) = anchor.unwrap();
        assert!((ax - 60.0).abs() < 1e-3 && (ay - 60.0).abs() < 1e-3);
    }

    #[test]
    fn ground_truth_is_hit_above_predictions() {
        // prediction x 20..80 around ground truth x 30..70
        let item = item("0 0.5 0.5 0.6 0.6 0.9", "1 0.5 0.5 0.4 0.4");
        let handle = Handle::from_rgba(1, 1, vec![0u8; 4]);
        let centre = Point::new(50.0, 50.0);

        let both = scene(&item, &handle, Layers::default());
        assert_eq!(both.hit(centre), Some((BoxRef::GroundTruth(0), None)));
        assert_eq!(both.hit(Point::new(95.0, 5.0)), None);

        let hidden_truth = Layers {
            ground_truth: false,
            ..Layers::default()
        };
        let predictions_only = scene(&item, &handle, hidden_truth);
        assert_eq!(predictions_only.hit(centre), Some((BoxRef::Prediction(0), None)));

        let nothing = Layers {
            predictions: false,
            ground_truth: false,
            final_labels: true,
        };
        assert_eq!(scene(&item, &handle, nothing).hit(centre), None);
    }
}
