use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{AuthResponse, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    repo_types::UpdateUser,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= MAX_NAME_LEN
}

/// Trim and lower-case the email, trim the other text fields.
pub(crate) fn normalize_registration(req: &mut RegisterRequest) {
    req.email = req.email.trim().to_lowercase();
    req.username = req.username.trim().to_string();
    req.first_name = req.first_name.trim().to_string();
    req.last_name = req.last_name.trim().to_string();
}

/// Returns the first problem found, as the message sent back to the client.
pub(crate) fn validate_registration(req: &RegisterRequest) -> Result<(), &'static str> {
    if !is_valid_name(&req.first_name) || !is_valid_name(&req.last_name) {
        return Err("Invalid name");
    }
    if !is_valid_email(&req.email) {
        return Err("Invalid email");
    }
    if !is_valid_username(&req.username) {
        return Err("Invalid username");
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err("Password too short");
    }
    Ok(())
}

pub(crate) fn validate_update(update: &mut UpdateUser) -> Result<(), &'static str> {
    if let Some(email) = update.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            return Err("Invalid email");
        }
    }
    for name in [update.first_name.as_mut(), update.last_name.as_mut()]
        .into_iter()
        .flatten()
    {
        *name = name.trim().to_string();
        if !is_valid_name(name) {
            return Err("Invalid name");
        }
    }
    Ok(())
}

/// Mint a fresh access/refresh pair for `user`.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: PublicUser) -> anyhow::Result<AuthResponse> {
    let user_id = user.id;
    Ok(AuthResponse {
        access_token: keys.sign_access(user_id)?,
        refresh_token: keys.sign_refresh(user_id)?,
        token_type: "bearer",
        user,
    })
}
