use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    #[serde(rename = "USER", alias = "ROLE_USER", alias = "user")]
    User,
    #[serde(rename = "ADMIN", alias = "ROLE_ADMIN", alias = "admin")]
    Admin,
}

/// Профиль пользователя, зеркалируется в хранилище под ключом `userData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Ответ `/api/auth/signin` и `/api/auth/signup`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    pub full_name: String,
    pub email: String,
}

impl AuthResponse {
    pub fn user(&self) -> User {
        User {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Claims JWT, который бэкенд кладет в OAuth-редирект.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// email
    pub sub: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub exp: Option<i64>,
}

// --- Формы ---

#[derive(Debug, Clone, Validate)]
pub struct SignUpForm {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Validate)]
pub struct ForgotPasswordForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Validate)]
pub struct ResetPasswordForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

// --- Тела запросов ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupRequest<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SigninRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResetPasswordRequest<'a> {
    pub email: &'a str,
    pub otp: &'a str,
    pub new_password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn auth_response_requires_token() {
        let missing = serde_json::from_str::<AuthResponse>(
            r#"{"role":"USER","fullName":"Asha","email":"asha@example.com"}"#,
        );
        assert!(missing.is_err());

        let ok: AuthResponse = serde_json::from_str(
            r#"{"token":"t","role":"ROLE_ADMIN","fullName":"Asha","email":"asha@example.com"}"#,
        )
        .unwrap();
        assert!(ok.user().is_admin());
    }

    #[test]
    fn sign_up_form_rejects_mismatched_passwords() {
        let form = SignUpForm {
            full_name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));
    }

    #[test]
    fn reset_form_requires_six_digit_otp() {
        let form = ResetPasswordForm {
            email: "asha@example.com".into(),
            otp: "123".into(),
            new_password: "pw".into(),
            confirm_password: "pw".into(),
        };
        assert!(form.validate().is_err());
    }
}
