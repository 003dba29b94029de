//! `Result` helper for logging failures where they are swallowed or mapped.

use std::fmt::Display;
use tracing::error;

/// Log the error (with call site) and pass the result through.
///
/// ```ignore
/// use omnipdf_control_plane::result_ext::ResultExt;
///
/// let doc = entities.get("Document", id).await.log("fetching document")?;
/// ```
pub trait ResultExt<T, E> {
    fn log<S: ToString>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let location = std::panic::Location::caller();
            error!(
                target: "omnipdf_control_plane",
                error = %e,
                file = %format!("{}:{}", location.file(), location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        let result: Result<u64, &str> = Ok(700);
        assert_eq!(result.log("compressing").unwrap(), 700);
    }

    #[test]
    fn test_err_passes_through() {
        let result: Result<u64, &str> = Err("document missing");
        assert_eq!(result.log("compressing").unwrap_err(), "document missing");
    }
}
