use std::collections::HashMap;

use crate::auth::CsrfGenerator;
use crate::forum::{NewComment, NewThread};
use crate::storage::UserRepository;

use super::{rules, ValidationErrors};

pub const LOGIN_ACTION: &str = "login";
pub const REGISTRATION_ACTION: &str = "registration";
pub const COMMENT_ACTION: &str = "comment";
pub const SUBMISSION_ACTION: &str = "submission";

/// Decoded `application/x-www-form-urlencoded` fields. Last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn parse(body: &[u8]) -> Self {
        Self(
            url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Field value, empty when missing.
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ==================== Login ====================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf: String,
    pub errors: ValidationErrors,
}

impl LoginForm {
    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            username: fields.text("username"),
            password: fields.text("password"),
            csrf: fields.text("csrf"),
            errors: ValidationErrors::new(),
        }
    }
}

pub fn validate_login(
    form: &mut LoginForm,
    csrf: &mut dyn CsrfGenerator,
    subject: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    rules::csrf(&mut errors, "CSRF", &mut form.csrf, csrf, subject, LOGIN_ACTION);
    rules::not_empty(&mut errors, "Username", &form.username);
    rules::not_empty(&mut errors, "Password", &form.password);
    finish(&mut form.errors, errors)
}

// ==================== Registration ====================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub csrf: String,
    pub errors: ValidationErrors,
}

impl RegistrationForm {
    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            username: fields.text("username").trim().to_string(),
            email: fields.text("email").trim().to_string(),
            password: fields.text("password"),
            password_confirmation: fields.text("password_confirmation"),
            csrf: fields.text("csrf"),
            errors: ValidationErrors::new(),
        }
    }
}

/// Validates a registration, including username and email uniqueness.
///
/// Lookup failures are not treated as conflicts; the insert reports them.
pub fn validate_registration(
    form: &mut RegistrationForm,
    csrf: &mut dyn CsrfGenerator,
    subject: &str,
    users: &dyn UserRepository,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    rules::csrf(&mut errors, "CSRF", &mut form.csrf, csrf, subject, REGISTRATION_ACTION);

    rules::not_empty(&mut errors, "Username", &form.username);
    rules::length_between(&mut errors, "Username", &form.username, 5, 100);
    if matches!(users.get_by_username(&form.username), Ok(Some(_))) {
        errors.append("Username", "invalid, please choose another username");
    }

    rules::not_empty(&mut errors, "Email", &form.email);
    rules::length_between(&mut errors, "Email", &form.email, 5, 100);
    rules::email(&mut errors, "Email", &form.email);
    if matches!(users.get_by_email(&form.email), Ok(Some(_))) {
        errors.append("Email", "invalid, please choose another email");
    }

    rules::not_empty(&mut errors, "Password", &form.password);
    rules::length_between(&mut errors, "Password", &form.password, 7, 255);
    rules::matches(
        &mut errors,
        "Password",
        "PasswordConfirmation",
        &form.password,
        &form.password_confirmation,
    );
    finish(&mut form.errors, errors)
}

// ==================== Comment ====================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    pub content: String,
    pub parent_id: i64,
    pub thread_id: i64,
    pub goto: String,
    pub csrf: String,
    pub errors: ValidationErrors,
}

impl CommentForm {
    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            content: fields.text("content"),
            parent_id: fields.int("parent_id").unwrap_or(0),
            thread_id: fields.int("thread_id").unwrap_or(0),
            goto: fields.text("goto"),
            csrf: fields.text("csrf"),
            errors: ValidationErrors::new(),
        }
    }

    pub fn to_new_comment(&self, author_id: i64) -> NewComment {
        NewComment {
            parent_id: self.parent_id,
            thread_id: self.thread_id,
            author_id,
            content: self.content.trim().to_string(),
        }
    }
}

pub fn validate_comment(
    form: &mut CommentForm,
    csrf: &mut dyn CsrfGenerator,
    subject: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    rules::csrf(&mut errors, "CSRF", &mut form.csrf, csrf, subject, COMMENT_ACTION);
    rules::not_empty(&mut errors, "Content", &form.content);
    rules::length_between(&mut errors, "Content", &form.content, 10, 500);
    rules::goto_target(&mut errors, "Goto", &form.goto);
    finish(&mut form.errors, errors)
}

// ==================== Submission ====================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub title: String,
    pub url: String,
    pub content: String,
    pub csrf: String,
    pub errors: ValidationErrors,
}

impl SubmissionForm {
    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            title: fields.text("title"),
            url: fields.text("url"),
            content: fields.text("content"),
            csrf: fields.text("csrf"),
            errors: ValidationErrors::new(),
        }
    }

    pub fn to_new_thread(&self, author_id: i64) -> NewThread {
        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        NewThread {
            title: self.title.trim().to_string(),
            url: optional(&self.url),
            content: optional(&self.content),
            author_id,
        }
    }
}

/// A story needs a title and a URL, a text, or both.
pub fn validate_submission(
    form: &mut SubmissionForm,
    csrf: &mut dyn CsrfGenerator,
    subject: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    rules::csrf(&mut errors, "CSRF", &mut form.csrf, csrf, subject, SUBMISSION_ACTION);
    rules::not_empty(&mut errors, "Title", &form.title);
    rules::length_between(&mut errors, "Title", &form.title, 5, 100);

    let has_url = !form.url.trim().is_empty();
    let has_content = !form.content.trim().is_empty();
    if has_url || !has_content {
        rules::not_empty(&mut errors, "URL", &form.url);
        rules::length_between(&mut errors, "URL", &form.url, 5, 255);
        rules::url(&mut errors, "URL", &form.url);
    }
    if has_content {
        rules::length_between(&mut errors, "Content", &form.content, 30, 500);
    }
    finish(&mut form.errors, errors)
}

fn finish(slot: &mut ValidationErrors, errors: ValidationErrors) -> Result<(), ValidationErrors> {
    *slot = errors.clone();
    errors.into_result()
}
