//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                       |
//! |------|-----------------------------------------------|
//! | 0    | Success (everything matched)                  |
//! | 1    | General error (unspecified)                   |
//! | 2    | CLI usage error (bad args, missing file)      |
//! | 3    | Run completed but unmatched records remain    |
//! | 4    | Invalid config (parse or validation failure)  |
//! | 5    | Runtime failure (unreadable input, bad CSV)   |

/// Success - run completed and every record found a counterpart.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Run completed but unmatched records remain on either side.
/// Like `diff(1)`, a nonzero code means "the sources differ."
pub const EXIT_UNMATCHED: u8 = 3;

/// Config rejected: TOML parse error, bad rule parameters, or a rule
/// naming a column absent from the loaded sources.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Runtime failure: unreadable input file, malformed CSV, write error.
pub const EXIT_RUNTIME: u8 = 5;
