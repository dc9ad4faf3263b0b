use super::AppState;
use crate::api::{BoardDetail, BoardSummary, UserRecord};

/// Partial update merged field by field into [`AppState`]. Fields left unset
/// keep their current value; set fields overwrite it.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    user: Option<Option<UserRecord>>,
    boards: Option<Vec<BoardSummary>>,
    current_board: Option<Option<BoardDetail>>,
    loading: Option<bool>,
    error: Option<Option<String>>,
}

impl StatePatch {
    pub fn new() -> Self {
        StatePatch::default()
    }

    pub fn user(mut self, user: Option<UserRecord>) -> Self {
        self.user = Some(user);
        self
    }

    pub fn boards(mut self, boards: Vec<BoardSummary>) -> Self {
        self.boards = Some(boards);
        self
    }

    pub fn current_board(mut self, board: Option<BoardDetail>) -> Self {
        self.current_board = Some(board);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    /// Blank messages are stored as no error at all.
    ///
    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error.filter(|message| !message.trim().is_empty()));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == StatePatch::default()
    }

    pub(super) fn apply(self, current: &AppState) -> AppState {
        AppState {
            user: self.user.unwrap_or_else(|| current.user.clone()),
            boards: self.boards.unwrap_or_else(|| current.boards.clone()),
            current_board: self
                .current_board
                .unwrap_or_else(|| current.current_board.clone()),
            loading: self.loading.unwrap_or(current.loading),
            error: self.error.unwrap_or_else(|| current.error.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{Fake, Faker};

    #[test]
    fn test_apply_keeps_unset_fields() {
        let board: BoardSummary = Faker.fake();
        let current = AppState {
            boards: vec![board.clone()],
            error: Some("old".to_string()),
            ..AppState::default()
        };
        let next = StatePatch::new().loading(true).apply(&current);
        assert!(next.loading);
        assert_eq!(next.boards, vec![board]);
        assert_eq!(next.error.as_deref(), Some("old"));
    }

    #[test]
    fn test_apply_clears_optional_fields() {
        let current = AppState {
            user: Some(Faker.fake()),
            error: Some("old".to_string()),
            ..AppState::default()
        };
        let next = StatePatch::new().user(None).error(None).apply(&current);
        assert_eq!(next.user, None);
        assert_eq!(next.error, None);
    }

    #[test]
    fn test_blank_error_is_absent() {
        let next = StatePatch::new()
            .error(Some("   ".to_string()))
            .apply(&AppState::default());
        assert_eq!(next.error, None);
        assert!(StatePatch::new().is_empty());
        assert!(!StatePatch::new().loading(false).is_empty());
    }
}
