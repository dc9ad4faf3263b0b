use super::failure::ClassifiedFailure;
use fake::Dummy;
use log::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Defines the role a user holds on the board.
///
#[derive(Clone, Copy, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER", alias = "GUEST")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    /// Name the server's role enum uses for this role.
    ///
    pub fn server_name(&self) -> &'static str {
        match self {
            Role::User => "GUEST",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a role typed by a person, accepting either server spelling.
    ///
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USER" | "GUEST" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Defines user data structure.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "userNo", alias = "id")]
    pub id: i64,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_dt: Option<String>,
}

/// Defines the author fields embedded in board payloads.
///
#[derive(Clone, Debug, Default, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub user_no: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Defines board list entry data structure.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub board_no: i64,
    pub title: String,
    #[serde(default)]
    pub view_cnt: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub create_dt: Option<String>,
    #[serde(default)]
    pub modify_dt: Option<String>,
}

impl BoardSummary {
    pub fn author_display(&self) -> &str {
        author_display(&self.author_name, &self.author)
    }
}

/// Defines board detail data structure.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetail {
    pub board_no: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub view_cnt: i64,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub create_dt: Option<String>,
    #[serde(default)]
    pub modify_dt: Option<String>,
}

impl BoardDetail {
    pub fn author_display(&self) -> &str {
        author_display(&self.author_name, &self.author)
    }
}

fn author_display<'a>(author_name: &'a Option<String>, author: &'a Option<Author>) -> &'a str {
    author_name
        .as_deref()
        .or_else(|| author.as_ref().and_then(|a| a.name.as_deref()))
        .unwrap_or("unknown")
}

/// Defines one page of the board listing (Spring page object).
///
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPage {
    #[serde(default)]
    pub content: Vec<BoardSummary>,
    #[serde(default)]
    pub total_elements: i64,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub size: i64,
}

/// Defines comment data structure.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_no: i64,
    pub content: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_user_id: Option<String>,
    #[serde(default)]
    pub author_no: Option<i64>,
    #[serde(default)]
    pub create_dt: Option<String>,
    #[serde(default)]
    pub modify_dt: Option<String>,
}

/// Like state of a board for the current user.
///
#[derive(Clone, Copy, Debug, Default, Dummy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

impl LikeStatus {
    /// Read `liked`/`likeCount` from a success payload, looking at most one
    /// `data` level deeper when the top level does not carry them.
    ///
    pub fn from_payload(payload: &Value) -> Result<LikeStatus, ClassifiedFailure> {
        LikeStatus::read(payload)
            .or_else(|| payload.get("data").and_then(LikeStatus::read))
            .ok_or_else(|| {
                warn!("Like payload carries no like state: {}", payload);
                ClassifiedFailure::unknown("The response carried no like state.")
            })
    }

    fn read(value: &Value) -> Option<LikeStatus> {
        Some(LikeStatus {
            liked: value.get("liked")?.as_bool()?,
            like_count: value.get("likeCount")?.as_i64()?,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

/// Defines login response data structure.
///
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    pub user: UserRecord,
}

/// Sign-up form, checked locally before it is sent.
///
#[derive(Clone, Debug, Dummy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub user_id: String,
    pub password: String,
    pub password_confirm: String,
    pub name: String,
    pub email: String,
}

impl SignupRequest {
    /// Reject forms the server is known to refuse, without a round trip.
    ///
    pub fn validate(&self) -> Result<(), ClassifiedFailure> {
        if !user_id_pattern().map_or(true, |re| re.is_match(&self.user_id)) {
            return Err(invalid(
                "User ID must be 3 to 15 letters or digits.",
                "INVALID_USER_ID_FORMAT",
            ));
        }
        if self.password.trim().is_empty() {
            return Err(invalid("Password is required.", "VALIDATION_ERROR"));
        }
        if self.password != self.password_confirm {
            return Err(invalid(
                "Password and confirmation do not match.",
                "PASSWORD_MISMATCH",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("Name is required.", "VALIDATION_ERROR"));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(invalid("A valid email address is required.", "VALIDATION_ERROR"));
        }
        Ok(())
    }
}

fn user_id_pattern() -> Option<&'static Regex> {
    static PATTERN: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(r"^[a-zA-Z0-9]{3,15}$") {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Failed to compile user id pattern: {}", e);
                None
            }
        })
        .as_ref()
}

/// Board create/update form.
///
#[derive(Clone, Debug, Dummy, PartialEq, Eq, Serialize)]
pub struct BoardDraft {
    pub title: String,
    pub content: String,
}

impl BoardDraft {
    pub const MAX_TITLE_CHARS: usize = 300;
    pub const MIN_CONTENT_CHARS: usize = 10;

    pub fn validate(&self) -> Result<(), ClassifiedFailure> {
        if self.title.trim().is_empty() {
            return Err(invalid("Title is required.", "VALIDATION_ERROR"));
        }
        if self.title.chars().count() > Self::MAX_TITLE_CHARS {
            return Err(invalid(
                "Title must be 300 characters or fewer.",
                "VALIDATION_ERROR",
            ));
        }
        if self.content.trim().chars().count() < Self::MIN_CONTENT_CHARS {
            return Err(invalid(
                "Content must be at least 10 characters.",
                "VALIDATION_ERROR",
            ));
        }
        Ok(())
    }
}

fn invalid(message: &str, code: &str) -> ClassifiedFailure {
    ClassifiedFailure::from_status(400, message).with_code(Some(code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::failure::FailureKind;
    use serde_json::json;

    fn signup() -> SignupRequest {
        SignupRequest {
            user_id: "user01".to_string(),
            password: "password123".to_string(),
            password_confirm: "password123".to_string(),
            name: "Hong".to_string(),
            email: "user@example.com".to_string(),
        }
    }

    #[test]
    fn test_role_accepts_guest_alias() {
        let role: Role = serde_json::from_value(json!("GUEST")).unwrap();
        assert_eq!(role, Role::User);
        let role: Role = serde_json::from_value(json!("ADMIN")).unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::User.server_name(), "GUEST");
    }

    #[test]
    fn test_user_record_from_server_payload() {
        let user: UserRecord = serde_json::from_value(json!({
            "userNo": 7,
            "userId": "admin01",
            "name": "Admin",
            "email": "admin@example.com",
            "role": "ADMIN"
        }))
        .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.user_id, "admin01");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn test_board_page_defaults() {
        let page: BoardPage = serde_json::from_value(json!({
            "content": [{ "boardNo": 1, "title": "Hello", "author": { "name": "Kim" } }]
        }))
        .unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].author_display(), "Kim");
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_like_payload_shapes() {
        let flat = json!({ "liked": true, "likeCount": 4 });
        assert_eq!(
            LikeStatus::from_payload(&flat).unwrap(),
            LikeStatus { liked: true, like_count: 4 }
        );

        let nested = json!({ "data": { "liked": false, "likeCount": 2 } });
        assert_eq!(
            LikeStatus::from_payload(&nested).unwrap(),
            LikeStatus { liked: false, like_count: 2 }
        );

        let too_deep = json!({ "data": { "data": { "liked": true, "likeCount": 1 } } });
        let failure = LikeStatus::from_payload(&too_deep).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Unknown);

        assert!(LikeStatus::from_payload(&Value::Null).is_err());
        assert!(LikeStatus::from_payload(&json!({ "liked": true })).is_err());
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup().validate().is_ok());

        let mut form = signup();
        form.user_id = "no".to_string();
        let failure = form.validate().unwrap_err();
        assert_eq!(failure.kind, FailureKind::BadRequest);
        assert_eq!(failure.code.as_deref(), Some("INVALID_USER_ID_FORMAT"));

        let mut form = signup();
        form.password_confirm = "different".to_string();
        let failure = form.validate().unwrap_err();
        assert_eq!(failure.code.as_deref(), Some("PASSWORD_MISMATCH"));
    }

    #[test]
    fn test_board_draft_validation() {
        let draft = BoardDraft {
            title: "Greetings".to_string(),
            content: "This is long enough.".to_string(),
        };
        assert!(draft.validate().is_ok());

        let short = BoardDraft {
            content: "short".to_string(),
            ..draft.clone()
        };
        assert_eq!(short.validate().unwrap_err().raw_status, 400);

        let long = BoardDraft {
            title: "x".repeat(301),
            ..draft
        };
        assert!(long.validate().is_err());
    }
}
