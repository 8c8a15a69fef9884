//! Exit code constants for the holdfast CLI.
//!
//! - 0: Success
//! - 1: User error (bad arguments, unexpected I/O failure)
//! - 2: Usage error (reserved for clap)
//! - 3: Lock held (present, acquisition failed, or removal declined)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or an unexpected I/O failure.
pub const USER_ERROR: i32 = 1;

/// The lock is held: `status` found a lock file, an acquisition timed out,
/// or a removal was declined because the holder looks live.
pub const LOCK_HELD: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(SUCCESS, USER_ERROR);
        assert_ne!(SUCCESS, LOCK_HELD);
        assert_ne!(USER_ERROR, LOCK_HELD);
    }

    #[test]
    fn exit_codes_leave_room_for_clap_usage_errors() {
        // clap exits with 2 on bad usage; nothing here may collide with it
        for code in [SUCCESS, USER_ERROR, LOCK_HELD] {
            assert_ne!(code, 2);
        }
    }
}
