//! CLI error types.

use std::fmt;

use error_stack::Report;
use tenpay_sign_common::error::SignatureError;

#[derive(Debug)]
pub enum CliError {
    /// Settings or key file error
    Config(String),
    /// Signing or verification could not be completed
    Signature(String),
    /// The callback signature did not verify
    Rejected,
    /// IO error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Signature(msg) => write!(f, "Signature error: {}", msg),
            CliError::Rejected => write!(f, "Callback signature rejected"),
            CliError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<Report<SignatureError>> for CliError {
    fn from(report: Report<SignatureError>) -> Self {
        match report.current_context() {
            SignatureError::Configuration { .. } => CliError::Config(format!("{:?}", report)),
            _ => CliError::Signature(format!("{:?}", report)),
        }
    }
}

impl CliError {
    /// Process exit code: 2 for a rejected callback, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Rejected => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_cli_error_display() {
        assert_eq!(
            format!("{}", CliError::Config("test".into())),
            "Configuration error: test"
        );
        assert_eq!(
            format!("{}", CliError::Signature("test".into())),
            "Signature error: test"
        );
        assert_eq!(
            format!("{}", CliError::Rejected),
            "Callback signature rejected"
        );
    }

    #[test]
    fn test_cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_cli_error_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.source().is_some());

        let config_err = CliError::Config("test".into());
        assert!(config_err.source().is_none());
    }

    #[test]
    fn test_cli_error_from_report() {
        let report = Report::new(SignatureError::Configuration {
            message: "bad".into(),
        });
        assert!(matches!(CliError::from(report), CliError::Config(_)));

        let report = Report::new(SignatureError::UnknownKeySerial {
            account: tenpay_sign_common::request_signing::AccountKey::new("1900000109", ""),
            serial: "ABC".into(),
        });
        assert!(matches!(CliError::from(report), CliError::Signature(_)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Rejected.exit_code(), 2);
        assert_eq!(CliError::Config("x".into()).exit_code(), 1);
    }
}
