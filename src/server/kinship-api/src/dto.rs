//! Request and response bodies.

use kinship_auth::{ProfileUpdate, Registration, Session, TokenPair};
use kinship_storage::{id::is_valid_id, Connection, Page, PageRequest, SortOrder, User};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const MIN_NAME_CHARS: usize = 5;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PAGE_SIZE: u32 = 100;

/// Validation of a deserialized request.
pub trait Validate {
    /// Returns a [`ApiError::Validation`] describing the first invalid field.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Returns true if `value` looks like an email address.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Returns true if `value` has at least 8 characters with a lowercase
/// letter, an uppercase letter, a digit and a symbol.
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= MIN_PASSWORD_CHARS
        && value.chars().any(|c| c.is_lowercase())
        && value.chars().any(|c| c.is_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if is_email(email.trim()) {
        Ok(())
    } else {
        Err(ApiError::validation("email must be an email"))
    }
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(ApiError::validation("password is not strong enough"))
    }
}

fn check_name(name: &str) -> Result<(), ApiError> {
    if name.trim().chars().count() >= MIN_NAME_CHARS {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "name must be longer than or equal to {MIN_NAME_CHARS} characters"
        )))
    }
}

/// Checks a path or body identifier.
pub fn check_id(field: &str, value: &str) -> Result<(), ApiError> {
    if is_valid_id(value) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("{field} must be a valid id")))
    }
}

/// `POST /v1/auth/verify-email`
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    /// Email to check.
    pub email: String,
}

impl Validate for VerifyEmailRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_email(&self.email)
    }
}

/// `POST /v1/auth/sign-up`
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Display name.
    pub name: String,
}

impl Validate for SignUpRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_email(&self.email)?;
        check_password(&self.password)?;
        check_name(&self.name)
    }
}

impl From<SignUpRequest> for Registration {
    fn from(req: SignUpRequest) -> Self {
        Registration {
            email: req.email,
            password: req.password,
            name: req.name,
        }
    }
}

/// `POST /v1/auth/sign-in`
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Email address or user id.
    pub identifier: String,
    /// Password.
    pub password: String,
}

impl Validate for SignInRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.identifier.trim().is_empty() {
            return Err(ApiError::validation("identifier should not be empty"));
        }
        if self.password.is_empty() {
            return Err(ApiError::validation("password should not be empty"));
        }
        if self.password.chars().any(char::is_whitespace) {
            return Err(ApiError::validation("password must not contain spaces"));
        }
        Ok(())
    }
}

/// `PATCH /v1/users/me`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name.
    pub name: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New password.
    pub password: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_none() && self.email.is_none() && self.password.is_none() {
            return Err(ApiError::validation("at least one field must be provided"));
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(password) = &self.password {
            check_password(password)?;
        }
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        Ok(())
    }
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            name: req.name,
            email: req.email,
            password: req.password,
        }
    }
}

/// `POST /v1/connections`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    /// Id of the user to connect with.
    pub connected_user: String,
}

impl Validate for CreateConnectionRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_id("connectedUser", &self.connected_user)
    }
}

/// Fields a listing may be sorted by.
const SORT_FIELDS: &[&str] = &["createdAt"];

/// `GET /v1/connections` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, at most 100.
    pub limit: Option<u32>,
    /// Sort field. Only `createdAt` is sortable.
    pub sort: Option<String>,
    /// `asc` or `desc` on the sort field.
    pub sort_order: Option<SortOrder>,
}

impl Validate for PaginationQuery {
    fn validate(&self) -> Result<(), ApiError> {
        if self.page == Some(0) {
            return Err(ApiError::validation("page must not be less than 1"));
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !SORT_FIELDS.contains(s)) {
            return Err(ApiError::validation(format!(
                "sort must be one of: {} (got {sort})",
                SORT_FIELDS.join(", ")
            )));
        }
        match self.limit {
            Some(0) => Err(ApiError::validation("limit must not be less than 1")),
            Some(limit) if limit > MAX_PAGE_SIZE => Err(ApiError::validation(format!(
                "limit must not be greater than {MAX_PAGE_SIZE}"
            ))),
            _ => Ok(()),
        }
    }
}

impl From<PaginationQuery> for PageRequest {
    fn from(query: PaginationQuery) -> Self {
        let defaults = PageRequest::default();
        PageRequest {
            page: query.page.unwrap_or(defaults.page),
            limit: query.limit.unwrap_or(defaults.limit),
            order: query.sort_order.unwrap_or(defaults.order),
        }
    }
}

/// A user as returned to its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User id.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Creation timestamp.
    pub created_at: u64,
    /// Last update timestamp.
    pub updated_at: u64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            avatar: user.avatar,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A user and a fresh token pair.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Signed-in user.
    pub user: UserResponse,
    /// `accessToken` and `refreshToken`.
    #[serde(flatten)]
    pub tokens: TokenPair,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user.into(),
            tokens: session.tokens,
        }
    }
}

/// Public view of another user.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    pub avatar: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
        }
    }
}

/// One connection of the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    /// Connection id, used to delete it.
    pub id: String,
    /// Id of the user on the other side.
    pub connected_user_id: String,
    /// The other user, if still active.
    pub connected_user: Option<UserSummary>,
    /// Creation timestamp.
    pub created_at: u64,
}

impl ConnectionResponse {
    /// Builds the response from a connection and its resolved other side.
    pub fn new(connection: Connection, connected_user: Option<User>) -> Self {
        Self {
            id: connection.id,
            connected_user_id: connection.connected_user_id,
            connected_user: connected_user.map(UserSummary::from),
            created_at: connection.created_at,
        }
    }
}

/// Paginated list body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Total number of items.
    pub total_count: u64,
    /// Current page.
    pub current_page: u32,
    /// Page size.
    pub page_size: u32,
    /// Number of pages.
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            total_pages: page.total_pages(),
            total_count: page.total,
            current_page: page.page,
            page_size: page.limit,
            data: page.items,
        }
    }
}

/// `GET /v1/auth/health-check`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
}
