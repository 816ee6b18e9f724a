use iced::{
    Element, Event, Subscription, Task, Theme, event,
    keyboard::{self, key::Named},
};

use super::{
    AppState, Message,
    screens::{
        Screen, ScreenMessage,
        review::{ReviewMessage, ReviewParentMessage, ReviewScreen},
    },
};
use crate::review::ReviewSession;

pub struct CorrectorApp {
    state: AppState,
    screen: ReviewScreen,
}

impl CorrectorApp {
    pub fn new(session: ReviewSession) -> Self {
        let state = AppState { session };
        let screen = ReviewScreen::new(&state);
        Self { state, screen }
    }

    pub fn title(&self) -> String {
        "YOLO Annotation Corrector".to_string()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Review(ScreenMessage::ScreenMessage(msg)) => self
                .screen
                .update(msg, &mut self.state)
                .map(Message::Review),
            Message::Review(ScreenMessage::ParentMessage(ReviewParentMessage::Exit)) => {
                log::info!("Exiting at image {}", self.screen.index() + 1);
                iced::exit()
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        self.screen.view(&self.state).map(Message::Review)
    }

    /// Arrow keys step through the images unless a widget took the key
    pub fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, status, _window| {
            if status == event::Status::Captured {
                return None;
            }
            let Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) = event else {
                return None;
            };
            let msg = match key {
                keyboard::Key::Named(Named::ArrowLeft) => ReviewMessage::Previous,
                keyboard::Key::Named(Named::ArrowRight) => ReviewMessage::Next,
                _ => return None,
            };
            Some(Message::Review(ScreenMessage::ScreenMessage(msg)))
        })
    }
}
