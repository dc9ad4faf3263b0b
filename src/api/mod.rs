mod client;
mod failure;
mod resource;

pub use client::{Client, Intent};
pub use failure::{ClassifiedFailure, FailureKind, GENERIC_MESSAGE, NETWORK_MESSAGE};
pub use resource::*;

use crate::session::SessionStore;
use log::*;
use serde::de::IgnoredAny;
use serde_json::{json, Value};

/// Base URL of a locally running board service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

type ApiResult<T> = Result<T, ClassifiedFailure>;

/// Responsible for asynchronous interaction with the board service including
/// transformation of response data into explicitly-defined types.
///
pub struct Api {
    client: Client,
}

impl Api {
    /// Returns a new instance for the given base URL and session.
    ///
    pub fn new(base_url: &str, session: SessionStore) -> Api {
        debug!("Initializing board client for {}...", base_url);
        Api {
            client: Client::new(base_url, session),
        }
    }

    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    /// Exchange credentials for an access token and the user record. The
    /// caller decides whether to store them.
    ///
    pub async fn login(&self, user_id: &str, password: &str) -> ApiResult<LoginResponse> {
        debug!("Requesting login for user '{}'...", user_id);
        let body = serde_json::to_value(LoginRequest {
            user_id: user_id.to_owned(),
            password: password.to_owned(),
        })
        .map_err(|e| ClassifiedFailure::unknown(e.to_string()))?;
        self.client.post("/auth/login", Some(body)).await
    }

    pub async fn signup(&self, form: &SignupRequest) -> ApiResult<()> {
        form.validate()?;
        debug!("Requesting signup for user '{}'...", form.user_id);
        let body =
            serde_json::to_value(form).map_err(|e| ClassifiedFailure::unknown(e.to_string()))?;
        let _: IgnoredAny = self.client.post("/auth/signup", Some(body)).await?;
        Ok(())
    }

    /// Returns one page of the board listing.
    ///
    pub async fn boards(&self, page: u32, size: u32) -> ApiResult<BoardPage> {
        debug!("Requesting boards page {} (size {})...", page, size);
        let page: BoardPage = self
            .client
            .get(
                "/boards",
                &[("page", page.to_string()), ("size", size.to_string())],
            )
            .await?;
        debug!(
            "Retrieved {} boards ({} total)",
            page.content.len(),
            page.total_elements
        );
        Ok(page)
    }

    pub async fn board(&self, board_no: i64) -> ApiResult<BoardDetail> {
        debug!("Requesting board {}...", board_no);
        self.client.get(&format!("/boards/{}", board_no), &[]).await
    }

    pub async fn create_board(&self, draft: &BoardDraft) -> ApiResult<BoardDetail> {
        draft.validate()?;
        debug!("Creating board '{}'...", draft.title);
        self.client.post("/boards", Some(draft_body(draft))).await
    }

    pub async fn update_board(&self, board_no: i64, draft: &BoardDraft) -> ApiResult<BoardDetail> {
        draft.validate()?;
        debug!("Updating board {}...", board_no);
        self.client
            .put(&format!("/boards/{}", board_no), Some(draft_body(draft)))
            .await
    }

    pub async fn delete_board(&self, board_no: i64) -> ApiResult<()> {
        debug!("Deleting board {}...", board_no);
        let _: IgnoredAny = self
            .client
            .delete(&format!("/boards/{}", board_no))
            .await?;
        Ok(())
    }

    pub async fn comments(&self, board_no: i64) -> ApiResult<Vec<Comment>> {
        debug!("Requesting comments for board {}...", board_no);
        self.client
            .get(&format!("/boards/{}/comments", board_no), &[])
            .await
    }

    pub async fn create_comment(&self, board_no: i64, content: &str) -> ApiResult<Comment> {
        debug!("Creating comment on board {}...", board_no);
        self.client
            .post(
                &format!("/boards/{}/comments", board_no),
                Some(json!({ "content": content })),
            )
            .await
    }

    pub async fn update_comment(
        &self,
        board_no: i64,
        comment_no: i64,
        content: &str,
    ) -> ApiResult<()> {
        debug!("Updating comment {} on board {}...", comment_no, board_no);
        let _: IgnoredAny = self
            .client
            .put(
                &format!("/boards/{}/comments/{}", board_no, comment_no),
                Some(json!({ "content": content })),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_comment(&self, board_no: i64, comment_no: i64) -> ApiResult<()> {
        debug!("Deleting comment {} on board {}...", comment_no, board_no);
        let _: IgnoredAny = self
            .client
            .delete(&format!("/boards/{}/comments/{}", board_no, comment_no))
            .await?;
        Ok(())
    }

    /// Toggle the like and return the raw payload; see
    /// [`LikeStatus::from_payload`] for how it is read.
    ///
    pub async fn toggle_like(&self, board_no: i64) -> ApiResult<Value> {
        debug!("Toggling like on board {}...", board_no);
        self.client
            .post(&format!("/boards/{}/like", board_no), None)
            .await
    }

    pub async fn like_status(&self, board_no: i64) -> ApiResult<LikeStatus> {
        debug!("Requesting like status for board {}...", board_no);
        let payload: Value = self
            .client
            .get(&format!("/boards/{}/like", board_no), &[])
            .await?;
        LikeStatus::from_payload(&payload)
    }

    pub async fn users(&self) -> ApiResult<Vec<UserRecord>> {
        debug!("Requesting user list...");
        self.client.get("/users", &[]).await
    }

    pub async fn me(&self) -> ApiResult<UserRecord> {
        debug!("Requesting authenticated user details...");
        self.client.get("/users/me", &[]).await
    }

    pub async fn update_user_role(&self, user_no: i64, role: Role) -> ApiResult<()> {
        debug!("Setting role of user {} to {:?}...", user_no, role);
        let _: IgnoredAny = self
            .client
            .put(
                &format!("/users/{}/role", user_no),
                Some(json!({ "role": role.server_name() })),
            )
            .await?;
        Ok(())
    }
}

fn draft_body(draft: &BoardDraft) -> Value {
    json!({ "title": draft.title, "content": draft.content })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::uuid::UUIDv4;
    use fake::{Fake, Faker};
    use httpmock::MockServer;
    use uuid::Uuid;

    fn api(server: &MockServer) -> Api {
        Api::new(&server.base_url(), SessionStore::in_memory())
    }

    #[tokio::test]
    async fn login_success() {
        let user: UserRecord = Faker.fake();
        let token: Uuid = UUIDv4.fake();

        let server = MockServer::start();
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/auth/login")
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "userId": "user01", "password": "secret" }));
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {
                        "accessToken": token.to_string(),
                        "tokenType": "Bearer",
                        "expiresIn": 3600,
                        "user": {
                            "userNo": user.id,
                            "userId": user.user_id,
                            "name": user.name,
                            "role": "GUEST"
                        }
                    }
                }));
            })
            .await;

        let response = api(&server).login("user01", "secret").await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.access_token, token.to_string());
        assert_eq!(response.user.id, user.id);
        assert_eq!(response.user.role, Role::User);
        assert_eq!(response.expires_in, 3600);
    }

    #[tokio::test]
    async fn login_rejected() {
        let server = MockServer::start();
        server
            .mock_async(|when, then| {
                when.method("POST").path("/auth/login");
                then.status(400).json_body(json!({
                    "success": false,
                    "error": {
                        "code": "INVALID_CREDENTIALS",
                        "message": "Wrong user id or password.",
                        "details": "Check your login details."
                    }
                }));
            })
            .await;

        let failure = api(&server).login("user01", "nope").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::BadRequest);
        assert_eq!(failure.message, "Wrong user id or password.");
        assert_eq!(failure.details.as_deref(), Some("Check your login details."));
    }

    #[tokio::test]
    async fn boards_success() {
        let boards: [BoardSummary; 2] = Faker.fake();

        let server = MockServer::start();
        let mock = server
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/boards")
                    .query_param("page", "2")
                    .query_param("size", "10");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {
                        "content": [
                            { "boardNo": boards[0].board_no, "title": boards[0].title },
                            { "boardNo": boards[1].board_no, "title": boards[1].title }
                        ],
                        "totalElements": 22,
                        "totalPages": 3,
                        "number": 2,
                        "size": 10
                    }
                }));
            })
            .await;

        let page = api(&server).boards(2, 10).await.unwrap();
        mock.assert_async().await;
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[1].title, boards[1].title);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn create_board_rejects_short_content_locally() {
        let server = MockServer::start();
        let mock = server
            .mock_async(|when, then| {
                when.method("POST").path("/boards");
                then.status(200).json_body(json!({ "success": true }));
            })
            .await;

        let draft = BoardDraft {
            title: "Title".to_string(),
            content: "short".to_string(),
        };
        let failure = api(&server).create_board(&draft).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::BadRequest);
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn comment_crud_paths() {
        let comment: Comment = Faker.fake();
        let server = MockServer::start();
        let list = server
            .mock_async(|when, then| {
                when.method("GET").path("/boards/5/comments");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": [{ "commentNo": comment.comment_no, "content": comment.content }]
                }));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method("PUT")
                    .path("/boards/5/comments/9")
                    .json_body(json!({ "content": "edited" }));
                then.status(200).json_body(json!({ "success": true }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method("DELETE").path("/boards/5/comments/9");
                then.status(200).json_body(json!({ "success": true, "data": null }));
            })
            .await;

        let api = api(&server);
        let comments = api.comments(5).await.unwrap();
        assert_eq!(comments[0].comment_no, comment.comment_no);
        api.update_comment(5, 9, "edited").await.unwrap();
        api.delete_comment(5, 9).await.unwrap();
        list.assert_async().await;
        update.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn like_status_accepts_nested_payload() {
        let server = MockServer::start();
        server
            .mock_async(|when, then| {
                when.method("GET").path("/boards/4/like");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": { "data": { "liked": true, "likeCount": 12 } }
                }));
            })
            .await;

        let status = api(&server).like_status(4).await.unwrap();
        assert_eq!(status, LikeStatus { liked: true, like_count: 12 });
    }

    #[tokio::test]
    async fn update_user_role_sends_server_name() {
        let server = MockServer::start();
        let mock = server
            .mock_async(|when, then| {
                when.method("PUT")
                    .path("/users/3/role")
                    .json_body(json!({ "role": "GUEST" }));
                then.status(200).json_body(json!({ "success": true }));
            })
            .await;

        api(&server).update_user_role(3, Role::User).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn me_unauthorized() {
        let server = MockServer::start();
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/users/me");
                then.status(401).json_body(json!({
                    "success": false,
                    "error": { "message": "Token expired" }
                }));
            })
            .await;

        let failure = api(&server).me().await.unwrap_err();
        assert!(failure.is_unauthorized());
        mock.assert_async().await;
    }
}
