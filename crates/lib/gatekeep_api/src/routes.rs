//! Route paths.

pub const GET_HEALTH: &str = "/v1/health";

pub const GET_AUTH_TOKEN_KID: &str = "/v1/auth/token/{kid}";
pub const POST_AUTH_LOGIN: &str = "/v1/auth/login";
pub const POST_AUTH_REFRESH: &str = "/v1/auth/refresh";
pub const POST_AUTH_FORGOT: &str = "/v1/auth/forgot";
pub const POST_AUTH_RESET_PASSWORD: &str = "/v1/auth/reset-password/{reset_token}";
pub const GET_AUTH_AUTHENTICATE: &str = "/v1/auth/authenticate";
pub const GET_AUTH_AUTHENTICATE_API: &str = "/v1/auth/authenticate-api";
pub const POST_AUTH_AUTHORIZE: &str = "/v1/auth/authorize";

pub const POST_USERS: &str = "/v1/users";
pub const USERS_ID: &str = "/v1/users/{user_id}";

/// Path parameter naming the reset secret.
pub const RESET_TOKEN_PARAM: &str = "reset_token";

/// Path parameter naming a principal.
pub const USER_ID_PARAM: &str = "user_id";
