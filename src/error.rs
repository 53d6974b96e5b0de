#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Configuration/usage error (bad flags, unreadable files, missing
    /// reference data).
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Startup failure: the model registry is unreachable or the artifact is
    /// missing/undecodable. Fatal before any UI is usable.
    pub fn startup(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Runtime/service error (non-2xx scoring responses, timeouts, terminal
    /// failures).
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_map_to_taxonomy_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::startup("x").exit_code(), 3);
        assert_eq!(AppError::runtime("x").exit_code(), 4);
    }

    #[test]
    fn display_shows_message_only() {
        let err = AppError::runtime("Scoring service returned 500: boom");
        assert_eq!(err.to_string(), "Scoring service returned 500: boom");
    }
}
