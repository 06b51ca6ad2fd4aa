//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 60-69   | link      | Record linkage runs                      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Link (60-69)
// =============================================================================

/// Config file failed to parse or validate (unknown algorithm, bad
/// threshold, empty rule list, duplicate pass names).
pub const EXIT_LINK_INVALID_CONFIG: u8 = 60;

/// Runtime or data error: unreadable table, missing column, duplicate id,
/// output not writable.
pub const EXIT_LINK_RUNTIME: u8 = 61;

/// Run completed but produced no matches and `--fail-on-empty` was given.
pub const EXIT_LINK_NO_MATCHES: u8 = 62;
