use crate::api::{
    Api, BoardDetail, BoardDraft, BoardPage, ClassifiedFailure, Comment, LikeStatus,
    LoginResponse, Role, SignupRequest, UserRecord,
};
use crate::coordinator::{ErrorCoordinator, Navigator};
use crate::like::LikeController;
use crate::session::SessionStore;
use crate::state::StateStore;
use log::*;
use std::future::Future;
use std::sync::Arc;

type ApiResult<T> = Result<T, ClassifiedFailure>;

/// Oversees the session, the application state and the services, routing
/// every failure to the error coordinator.
///
pub struct BoardApp {
    api: Arc<Api>,
    state: StateStore,
    errors: Arc<ErrorCoordinator>,
    navigator: Arc<dyn Navigator>,
    like: LikeController<Api>,
}

/// Holds `loading` true until dropped.
struct Loading<'a>(&'a StateStore);

impl<'a> Loading<'a> {
    fn start(state: &'a StateStore) -> Self {
        state.set_loading(true);
        Loading(state)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}

impl BoardApp {
    /// Start a new application over the given services. The signed-in user,
    /// if the session has one, is copied into the state.
    ///
    pub fn new(
        api: Arc<Api>,
        state: StateStore,
        errors: Arc<ErrorCoordinator>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        if let Some(user) = api.session().user() {
            debug!("Restoring session for user '{}'", user.user_id);
            state.set_user(Some(user));
        }
        let like = LikeController::new(Arc::clone(&api));
        BoardApp {
            api,
            state,
            errors,
            navigator,
            like,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    pub fn errors(&self) -> &Arc<ErrorCoordinator> {
        &self.errors
    }

    pub fn like(&self) -> &LikeController<Api> {
        &self.like
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.session().is_admin()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.session().user()
    }

    /// Run a request with `loading` set, surfacing any failure.
    ///
    async fn track<T, F>(&self, request: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        let _loading = Loading::start(&self.state);
        let result = request.await;
        if let Err(ref failure) = result {
            self.errors.handle(failure);
        }
        result
    }

    fn surface<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(ref failure) = result {
            self.errors.handle(failure);
        }
        result
    }

    pub async fn login(&self, user_id: &str, password: &str) -> ApiResult<LoginResponse> {
        info!("Signing in as '{}'...", user_id);
        let response = self.track(self.api.login(user_id, password)).await?;
        self.session()
            .login(response.access_token.clone(), response.user.clone());
        self.state.set_user(Some(response.user.clone()));
        info!("Signed in as '{}'", response.user.name);
        Ok(response)
    }

    pub async fn signup(&self, form: &SignupRequest) -> ApiResult<()> {
        info!("Signing up '{}'...", form.user_id);
        self.track(self.api.signup(form)).await
    }

    pub fn logout(&self) {
        info!("Signing out...");
        self.session().teardown();
        self.state.set_user(None);
        self.navigator.redirect_to_login();
    }

    pub async fn load_boards(&self, page: u32, size: u32) -> ApiResult<BoardPage> {
        let page = self.track(self.api.boards(page, size)).await?;
        self.state.set_boards(page.content.clone());
        Ok(page)
    }

    pub async fn load_board(&self, board_no: i64) -> ApiResult<BoardDetail> {
        let board = self.track(self.api.board(board_no)).await?;
        self.state.set_current_board(Some(board.clone()));
        Ok(board)
    }

    pub async fn create_board(&self, draft: &BoardDraft) -> ApiResult<BoardDetail> {
        let board = self.track(self.api.create_board(draft)).await?;
        info!("Created board {}", board.board_no);
        Ok(board)
    }

    pub async fn update_board(&self, board_no: i64, draft: &BoardDraft) -> ApiResult<BoardDetail> {
        let board = self.track(self.api.update_board(board_no, draft)).await?;
        self.state.set_current_board(Some(board.clone()));
        Ok(board)
    }

    /// Delete the board and drop it from the loaded list.
    ///
    pub async fn delete_board(&self, board_no: i64) -> ApiResult<()> {
        self.track(self.api.delete_board(board_no)).await?;
        let current = self.state.get();
        let boards = current
            .boards
            .iter()
            .filter(|board| board.board_no != board_no)
            .cloned()
            .collect();
        self.state.set_boards(boards);
        if current
            .current_board
            .as_ref()
            .map_or(false, |board| board.board_no == board_no)
        {
            self.state.set_current_board(None);
        }
        Ok(())
    }

    pub async fn load_comments(&self, board_no: i64) -> ApiResult<Vec<Comment>> {
        self.track(self.api.comments(board_no)).await
    }

    pub async fn add_comment(&self, board_no: i64, content: &str) -> ApiResult<Comment> {
        self.track(self.api.create_comment(board_no, content)).await
    }

    pub async fn edit_comment(
        &self,
        board_no: i64,
        comment_no: i64,
        content: &str,
    ) -> ApiResult<()> {
        self.track(self.api.update_comment(board_no, comment_no, content)).await
    }

    pub async fn remove_comment(&self, board_no: i64, comment_no: i64) -> ApiResult<()> {
        self.track(self.api.delete_comment(board_no, comment_no)).await
    }

    /// Fetch the like state and seed the like control with it.
    ///
    pub async fn load_like(&self, board_no: i64) -> ApiResult<LikeStatus> {
        let status = self.surface(self.api.like_status(board_no).await)?;
        self.like.initialize(status.liked, status.like_count);
        Ok(status)
    }

    /// Optimistic like toggle. `Ok(None)` means a toggle was already running.
    ///
    pub async fn toggle_like(&self, board_no: i64) -> ApiResult<Option<LikeStatus>> {
        let result = self.like.toggle(board_no).await;
        self.surface(result)
    }

    pub async fn users(&self) -> ApiResult<Vec<UserRecord>> {
        self.track(self.api.users()).await
    }

    /// Re-fetch the signed-in user, replacing the stored record.
    ///
    pub async fn refresh_me(&self) -> ApiResult<UserRecord> {
        let user = self.track(self.api.me()).await?;
        self.session().set_user(Some(user.clone()));
        self.state.set_user(Some(user.clone()));
        Ok(user)
    }

    pub async fn update_user_role(&self, user_no: i64, role: Role) -> ApiResult<()> {
        self.track(self.api.update_user_role(user_no, role)).await
    }
}
