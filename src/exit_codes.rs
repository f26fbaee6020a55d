//! Exit code constants for the lockprobe CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, unwritable output)
//! - 2: Connection failure (a session could not be established)
//! - 3: Query failure (a fixture statement or an observed pair failed)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or output failure.
pub const USER_ERROR: i32 = 1;

/// Connection failure: the server could not be reached or refused the login.
pub const CONNECTION_FAILURE: i32 = 2;

/// Query failure: a statement, status fetch, or rollback failed.
pub const QUERY_FAILURE: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, CONNECTION_FAILURE, QUERY_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
