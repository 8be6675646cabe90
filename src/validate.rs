use crate::types::{FieldError, SendRequest};

/// Outcome of checking an inbound request for its required fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

/// A request whose five fields are all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub secret_id: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
    pub message: String,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.is_empty())
}

/// Reports every missing field, in declaration order.
pub fn validate(req: &SendRequest) -> ValidationResult {
    let checks = [
        (&req.secret_id, "Access key is missing"),
        (&req.auth_token, "Auth token is missing"),
        (&req.from_number, "from phone number is missing"),
        (&req.to_number, "to phone number is missing"),
        (&req.message, "SMS message is missing"),
    ];

    let errors: Vec<FieldError> = checks
        .iter()
        .filter(|(field, _)| !present(field))
        .map(|(_, message)| FieldError {
            message: message.to_string(),
        })
        .collect();

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

impl SendRequest {
    /// Validates and converts into the owned, immutable form the pipeline uses.
    pub fn into_validated(self) -> Result<ValidatedRequest, Vec<FieldError>> {
        let result = validate(&self);
        if !result.valid {
            return Err(result.errors);
        }
        Ok(ValidatedRequest {
            secret_id: self.secret_id.unwrap_or_default(),
            auth_token: self.auth_token.unwrap_or_default(),
            from_number: self.from_number.unwrap_or_default(),
            to_number: self.to_number.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
        })
    }
}
