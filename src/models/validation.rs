use serde::{Deserialize, Serialize};

use crate::models::dto::{NewTodo, TodoPatch};

pub const TITLE_MIN_CHARS: usize = 2;
pub const TITLE_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 255;

/// Field-level validation failure, rendered next to the offending input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    let len = title.trim().chars().count();
    if len < TITLE_MIN_CHARS {
        errors.push(FieldError::new(
            "title",
            format!("Your todo title should be at least {TITLE_MIN_CHARS} characters long"),
        ));
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.push(FieldError::new(
            "title",
            format!("Your todo title should be no more than {TITLE_MAX_CHARS} characters long"),
        ));
    }
}

fn check_description(description: &str, errors: &mut Vec<FieldError>) {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push(FieldError::new(
            "description",
            format!(
                "Your todo description should be no more than {} characters long",
                DESCRIPTION_MAX_CHARS
            ),
        ));
    }
}

impl NewTodo {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        check_title(&self.title, &mut errors);
        check_description(&self.description, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl TodoPatch {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }
        if let Some(description) = &self.description {
            check_description(description, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn title_bounds() {
        assert!(NewTodo::new("ok", "", due()).validate().is_ok());

        let errors = NewTodo::new(" a ", "", due()).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");

        let long = "x".repeat(TITLE_MAX_CHARS + 1);
        assert!(NewTodo::new(long, "", due()).validate().is_err());
    }

    #[test]
    fn reports_every_invalid_field() {
        let patch = TodoPatch {
            title: Some(String::new()),
            description: Some("d".repeat(DESCRIPTION_MAX_CHARS + 1)),
            ..Default::default()
        };
        let fields: Vec<_> = patch.validate().unwrap_err().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["title", "description"]);
    }

    #[test]
    fn untouched_fields_are_not_validated() {
        assert!(TodoPatch::default().validate().is_ok());
    }
}
