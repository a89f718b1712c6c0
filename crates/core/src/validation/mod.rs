//! Form parsing and validation.
//!
//! Every validator checks the submitted CSRF token first and then mints a
//! fresh one into the form, whatever the outcome, so a re-rendered form can
//! be submitted again.

mod errors;
mod forms;
mod rules;

pub use errors::ValidationErrors;
pub use forms::{
    validate_comment, validate_login, validate_registration, validate_submission, CommentForm,
    FormFields, LoginForm, RegistrationForm, SubmissionForm, COMMENT_ACTION, LOGIN_ACTION,
    REGISTRATION_ACTION, SUBMISSION_ACTION,
};
pub use rules::{is_email, is_goto_target, is_url};
