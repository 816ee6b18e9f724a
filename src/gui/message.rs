use crate::gui::screens::{ScreenMessage, review::ReviewScreen};

#[derive(Debug, Clone)]
pub enum Message {
    Review(ScreenMessage<ReviewScreen>),
}
