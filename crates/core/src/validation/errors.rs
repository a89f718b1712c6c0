use std::collections::BTreeMap;

/// Per-field validation messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    /// Messages for `field`, empty when it is valid.
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Flattens to `"Field: message"` lines for display.
    pub fn messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field}: {m}")))
            .collect()
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_errors_convert_to_ok() {
        let errors = ValidationErrors::new();
        assert!(!errors.has_errors());
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn append_accumulates_per_field() {
        let mut errors = ValidationErrors::new();
        errors.append("Username", "should not be empty");
        errors.append("Username", "should be at least 5 characters long");
        errors.append("CSRF", "invalid token");

        assert_eq!(errors.field("Username").len(), 2);
        assert_eq!(errors.field("Password"), &[] as &[String]);
        assert!(errors.has_field("CSRF"));
        assert_eq!(
            errors.to_string(),
            "CSRF: invalid token; Username: should not be empty; Username: should be at least 5 characters long"
        );
        assert!(errors.into_result().is_err());
    }
}
