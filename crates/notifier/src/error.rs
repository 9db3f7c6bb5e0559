use thiserror::Error;

/// FCM error codes, in the `messaging/*` vocabulary stored on records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRegistrationToken,
    RegistrationTokenNotRegistered,
    InvalidArgument,
    MismatchedCredential,
    MessageRateExceeded,
    ServerUnavailable,
    InternalError,
    ThirdPartyAuthError,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRegistrationToken => "messaging/invalid-registration-token",
            ErrorCode::RegistrationTokenNotRegistered => {
                "messaging/registration-token-not-registered"
            }
            ErrorCode::InvalidArgument => "messaging/invalid-argument",
            ErrorCode::MismatchedCredential => "messaging/mismatched-credential",
            ErrorCode::MessageRateExceeded => "messaging/message-rate-exceeded",
            ErrorCode::ServerUnavailable => "messaging/server-unavailable",
            ErrorCode::InternalError => "messaging/internal-error",
            ErrorCode::ThirdPartyAuthError => "messaging/third-party-auth-error",
            ErrorCode::UnknownError => "messaging/unknown-error",
        }
    }

    /// The token itself is dead and should be dropped from the user.
    pub fn is_stale_token(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidRegistrationToken | ErrorCode::RegistrationTokenNotRegistered
        )
    }

    /// Map an FCM v1 `errorCode` / google.rpc `status` string.
    ///
    /// `message` disambiguates `INVALID_ARGUMENT`, which FCM also uses for
    /// malformed registration tokens.
    pub fn from_fcm(code: &str, message: &str) -> Self {
        match code {
            "UNREGISTERED" | "NOT_FOUND" => ErrorCode::RegistrationTokenNotRegistered,
            "INVALID_ARGUMENT" if message.to_lowercase().contains("registration token") => {
                ErrorCode::InvalidRegistrationToken
            }
            "INVALID_ARGUMENT" => ErrorCode::InvalidArgument,
            "SENDER_ID_MISMATCH" | "PERMISSION_DENIED" => ErrorCode::MismatchedCredential,
            "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => ErrorCode::MessageRateExceeded,
            "UNAVAILABLE" => ErrorCode::ServerUnavailable,
            "INTERNAL" => ErrorCode::InternalError,
            "THIRD_PARTY_AUTH_ERROR" | "UNAUTHENTICATED" => ErrorCode::ThirdPartyAuthError,
            _ => ErrorCode::UnknownError,
        }
    }

    /// Fallback when the error body is missing or unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::InvalidArgument,
            401 => ErrorCode::ThirdPartyAuthError,
            403 => ErrorCode::MismatchedCredential,
            404 => ErrorCode::RegistrationTokenNotRegistered,
            429 => ErrorCode::MessageRateExceeded,
            500 => ErrorCode::InternalError,
            503 => ErrorCode::ServerUnavailable,
            _ => ErrorCode::UnknownError,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by a push gateway, per token or per call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// FCM answered and refused the message
    #[error("{message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn rejected(code: ErrorCode, message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Error code recorded in `errorDetails`.
    pub fn code(&self) -> &str {
        match self {
            GatewayError::Rejected { code, .. } => code.as_str(),
            GatewayError::Http(_) => "app/network-error",
            GatewayError::Auth(_) => "app/invalid-credential",
            GatewayError::InvalidResponse(_) => ErrorCode::UnknownError.as_str(),
        }
    }

    pub fn is_stale_token(&self) -> bool {
        matches!(self, GatewayError::Rejected { code, .. } if code.is_stale_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_maps_to_stale_token() {
        let code = ErrorCode::from_fcm("UNREGISTERED", "Requested entity was not found.");
        assert_eq!(code, ErrorCode::RegistrationTokenNotRegistered);
        assert!(code.is_stale_token());
        assert_eq!(code.as_str(), "messaging/registration-token-not-registered");
    }

    #[test]
    fn test_invalid_argument_split_on_message() {
        assert_eq!(
            ErrorCode::from_fcm(
                "INVALID_ARGUMENT",
                "The registration token is not a valid FCM registration token"
            ),
            ErrorCode::InvalidRegistrationToken
        );
        assert_eq!(
            ErrorCode::from_fcm("INVALID_ARGUMENT", "Invalid value at 'message.data[0].value'"),
            ErrorCode::InvalidArgument
        );
        assert!(!ErrorCode::InvalidArgument.is_stale_token());
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            ErrorCode::from_fcm("SOMETHING_NEW", ""),
            ErrorCode::UnknownError
        );
    }

    #[test]
    fn test_gateway_error_code_and_staleness() {
        let err = GatewayError::rejected(ErrorCode::InvalidRegistrationToken, "bad token");
        assert_eq!(err.code(), "messaging/invalid-registration-token");
        assert_eq!(err.to_string(), "bad token");
        assert!(err.is_stale_token());

        let err = GatewayError::Auth("no credentials".to_string());
        assert_eq!(err.code(), "app/invalid-credential");
        assert!(!err.is_stale_token());
    }
}
