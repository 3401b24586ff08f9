/// Error-state visibility rules for dialog form fields
///
/// A field failing validation is not the same as a field *showing* an
/// error: required-field violations stay quiet until the user attempts to
/// save, then become visible on every field at once.

/// Transient state of a single text field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldState {
    /// Current field value
    pub value: String,
    /// The user has interacted with the field
    pub touched: bool,
    /// The value differs from the seeded one
    pub dirty: bool,
    /// Edits are ignored while disabled (read-only dialogs)
    pub disabled: bool,
}

impl FieldState {
    /// A fresh field seeded with an initial value
    pub fn seeded(value: String) -> Self {
        FieldState {
            value,
            ..FieldState::default()
        }
    }

    /// Required validation: a value must be present.
    /// Whitespace counts as present, matching the usual form-framework rule.
    pub fn is_valid(&self) -> bool {
        !self.value.is_empty()
    }

    /// Record a user edit. Ignored while the field is disabled.
    pub fn input(&mut self, value: String) {
        if self.disabled {
            return;
        }
        self.value = value;
        self.touched = true;
        self.dirty = true;
    }
}

/// Form-wide context consulted by the error-state policy
#[derive(Debug, Clone, Copy, Default)]
pub struct FormContext {
    /// The user has attempted to save at least once
    pub submitted: bool,
}

/// Base predicate supplied by the hosting form layer
pub type BaseErrorPolicy = fn(&FieldState, &FormContext) -> bool;

/// Default base rule: a field presents as invalid once the user has
/// interacted with it and the value fails validation.
pub fn touched_error_policy(field: &FieldState, _form: &FormContext) -> bool {
    !field.is_valid() && field.touched
}

/// Decides whether a field should visually present as invalid.
///
/// Composes the injected base predicate with the dialog's own rule: once a
/// save has been attempted, every invalid field shows its error
/// immediately, even if never individually touched.
#[derive(Debug, Clone, Copy)]
pub struct ErrorStatePolicy {
    base: BaseErrorPolicy,
}

impl ErrorStatePolicy {
    pub fn new(base: BaseErrorPolicy) -> Self {
        ErrorStatePolicy { base }
    }

    pub fn is_error_state(&self, field: &FieldState, form: &FormContext) -> bool {
        (self.base)(field, form) || (!field.is_valid() && form.submitted)
    }
}

impl Default for ErrorStatePolicy {
    fn default() -> Self {
        ErrorStatePolicy::new(touched_error_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_before_submission() {
        let policy = ErrorStatePolicy::default();
        let form = FormContext { submitted: false };

        // Empty and invalid, but the user has not typed or saved yet
        let field = FieldState::seeded(String::new());
        assert!(!policy.is_error_state(&field, &form));

        let field = FieldState::seeded("Sunset".to_string());
        assert!(!policy.is_error_state(&field, &form));
    }

    #[test]
    fn test_submission_unmasks_all_violations() {
        let policy = ErrorStatePolicy::default();
        let form = FormContext { submitted: true };

        // Never touched, still shown once a save was attempted
        let field = FieldState::seeded(String::new());
        assert!(policy.is_error_state(&field, &form));

        let field = FieldState::seeded("Sunset".to_string());
        assert!(!policy.is_error_state(&field, &form));
    }

    #[test]
    fn test_base_policy_fires_on_touched_fields() {
        let policy = ErrorStatePolicy::default();
        let form = FormContext { submitted: false };

        let mut field = FieldState::seeded("Sunset".to_string());
        field.input(String::new());

        // Cleared by the user: visible even without a save attempt
        assert!(policy.is_error_state(&field, &form));
    }

    #[test]
    fn test_injected_base_policy_is_ored_in() {
        fn always(_: &FieldState, _: &FormContext) -> bool {
            true
        }

        let policy = ErrorStatePolicy::new(always);
        let form = FormContext { submitted: false };
        let field = FieldState::seeded("perfectly valid".to_string());

        assert!(policy.is_error_state(&field, &form));
    }

    #[test]
    fn test_disabled_field_ignores_input() {
        let mut field = FieldState::seeded("Original".to_string());
        field.disabled = true;

        field.input("tampered".to_string());

        assert_eq!(field.value, "Original");
        assert!(!field.touched);
        assert!(!field.dirty);
    }
}
