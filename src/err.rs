use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use snafu::{Backtrace, Snafu};
use std::io;

#[derive(Snafu, Debug)]
#[snafu(visibility = "pub")]
pub enum Error {
    #[snafu(display("Io error: {}: {}", description, source))]
    Io {
        source: io::Error,
        description: String,
        backtrace: Backtrace,
    },

    // Selection
    #[snafu(display("No files selected"))]
    NoFilesSelected,
    #[snafu(display("No selected file at position {} (selection has {})", index, len))]
    NoSuchSelectionItem { index: usize, len: usize },

    // Ledger
    #[snafu(display("No upload record with id {}", id))]
    NoSuchRecord { id: usize },
    #[snafu(display("Upload record {} has not failed and cannot be retried", id))]
    NotRetryable { id: usize },

    // Transfer
    #[snafu(display("S3 'put object' error on key '{}': {}", key, source))]
    PutObject {
        source: SdkError<PutObjectError>,
        key: String,
    },
    #[snafu(display("Store rejected key '{}': {}", key, reason))]
    Rejected { key: String, reason: String },

    // Auth
    #[snafu(display("Sign-out failed: {}", reason))]
    SignOut { reason: String },

    // Configuration
    #[snafu(display("Reading config {}: {}", path, source))]
    ConfigRead { path: String, source: io::Error },
    #[snafu(display("Parsing config {}: {}", path, reason))]
    ConfigParse { path: String, reason: String },
    #[snafu(display("Invalid value '{}' for {}", value, name))]
    InvalidArgument { name: String, value: String },
}

impl Error {
    /// Errors caused by what the user picked or typed, as opposed to transfer
    /// or session failures.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Error::NoFilesSelected
                | Error::NoSuchSelectionItem { .. }
                | Error::InvalidArgument { .. }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use snafu::GenerateBacktrace;
    #[test]
    fn error_traits() {
        fn foo<T: Send>(_: T) {}
        foo(Error::Io {
            source: io::Error::from_raw_os_error(1),
            description: "hello".into(),
            backtrace: Backtrace::generate(),
        });
    }

    #[test]
    fn user_input_errors() {
        assert!(Error::NoFilesSelected.is_user_input());
        assert!(Error::NoSuchSelectionItem { index: 3, len: 1 }.is_user_input());
        assert!(!Error::SignOut {
            reason: "offline".into()
        }
        .is_user_input());
        assert_eq!(Error::NoFilesSelected.to_string(), "No files selected");
    }
}
