use crate::review::ReviewSession;

#[derive(Debug, Default)]
pub struct AppState {
    pub session: ReviewSession,
}
