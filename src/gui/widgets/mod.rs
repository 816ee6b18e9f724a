pub mod scene;
pub mod viewport;

use iced::{
    Color, Element, Length, Theme, border,
    widget::{button, column, container, container::Style, container::bordered_box, scrollable, text},
};

/// Review status of one image in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Current,
    Other,
}

impl Entry {
    fn style(self) -> impl Fn(&Theme) -> Style {
        move |theme: &Theme| {
            let style = bordered_box(theme).border(border::width(1));
            if self == Entry::Current {
                style.background(theme.palette().primary)
            } else {
                // darken the rest
                let mut color_rgba = theme.palette().background.into_rgba8();
                color_rgba[0] /= 2;
                color_rgba[1] /= 2;
                color_rgba[2] /= 2;
                style.background(Color::from_rgb8(color_rgba[0], color_rgba[1], color_rgba[2]))
            }
        }
    }
}

/// Sidebar listing the images under review; `on_select` jumps to one
pub fn image_list<'a, Message>(
    names: impl IntoIterator<Item = String>,
    current: usize,
    on_select: impl Fn(usize) -> Message,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    let entries = names.into_iter().enumerate().map(|(idx, name)| {
        let entry = if idx == current { Entry::Current } else { Entry::Other };
        container(button(text(name).size(13)).on_press(on_select(idx)).style(button::text))
            .style(entry.style())
            .width(Length::Fill)
            .padding(4)
            .into()
    });

    scrollable(column(entries).spacing(2)).height(Length::Fill).into()
}

pub fn layout<'a, Message>(
    sidebar: impl Into<Element<'a, Message>>,
    main_content: impl Into<Element<'a, Message>>,
) -> Element<'a, Message>
where
    Message: 'a,
{
    container(iced::widget::row![
        container(sidebar.into())
            .height(Length::Fill)
            .width(Length::FillPortion(1)),
        container(main_content.into()).width(Length::FillPortion(5)),
    ])
    .center_x(Length::Fill)
    .center_y(Length::Fill)
    .into()
}
