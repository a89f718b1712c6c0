use url::Url;

use crate::auth::CsrfGenerator;

use super::ValidationErrors;

pub(crate) fn not_empty(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.append(field, "should not be empty");
    }
}

pub(crate) fn min_length(errors: &mut ValidationErrors, field: &str, value: &str, min: usize) {
    if value.chars().count() < min {
        errors.append(field, format!("should be at least {min} characters long"));
    }
}

pub(crate) fn max_length(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.append(field, format!("should be at most {max} characters long"));
    }
}

pub(crate) fn length_between(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    min_length(errors, field, value, min);
    max_length(errors, field, value, max);
}

pub(crate) fn matches(
    errors: &mut ValidationErrors,
    field: &str,
    other_field: &str,
    value: &str,
    other: &str,
) {
    if value != other {
        errors.append(field, format!("should match {other_field}"));
    }
}

pub(crate) fn email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_email(value) {
        errors.append(field, "should be a valid email");
    }
}

pub(crate) fn url(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_url(value) {
        errors.append(field, "should be a valid URL");
    }
}

pub(crate) fn goto_target(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_goto_target(value) {
        errors.append(field, "should be a local path with a query string");
    }
}

/// Consumes the submitted token, then mints a fresh one for the next render.
pub(crate) fn csrf(
    errors: &mut ValidationErrors,
    field: &str,
    token: &mut String,
    generator: &mut dyn CsrfGenerator,
    subject: &str,
    action: &str,
) {
    if token.is_empty() || !generator.valid(token, subject, action) {
        errors.append(field, "invalid token");
    }
    *token = generator.generate(subject, action);
}

/// Loose email check: one `@`, a non-empty local part and a dotted domain.
pub fn is_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    match candidate.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// HTTP(S) URL with a dotted host. The scheme may be omitted.
pub fn is_url(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let parsed = Url::parse(candidate).or_else(|_| Url::parse(&format!("http://{candidate}")));
    match parsed {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url
                    .host_str()
                    .is_some_and(|host| host.contains('.') && !host.starts_with('.'))
        }
        Err(_) => false,
    }
}

/// Local redirect target of the form `/path?query`.
///
/// Protocol-relative and absolute URLs are rejected so the target can never
/// leave the site. Backslashes are rejected too, since browsers read them as
/// slashes.
pub fn is_goto_target(candidate: &str) -> bool {
    if !candidate.starts_with('/') || candidate.starts_with("//") {
        return false;
    }
    if candidate.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    if candidate.contains("://") || candidate.contains('\\') {
        return false;
    }
    match candidate[1..].split_once('?') {
        Some((path, query)) => !path.is_empty() && !query.is_empty(),
        None => false,
    }
}
