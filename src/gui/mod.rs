mod app;
mod message;
mod screens;
mod state;
mod widgets;

pub use app::CorrectorApp;
pub use message::Message;
pub use state::AppState;

use crate::review::ReviewSession;

/// Open the review window over a prepared session
pub fn run(session: ReviewSession) -> iced::Result {
    iced::application(
        move || CorrectorApp::new(session.clone()),
        CorrectorApp::update,
        CorrectorApp::view,
    )
    .title(CorrectorApp::title)
    .theme(CorrectorApp::theme)
    .subscription(CorrectorApp::subscription)
    .run()
}
