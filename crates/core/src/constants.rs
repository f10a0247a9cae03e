//! Constants shared across the queue crates.

/// Default bind address for the queue REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Default number of upcoming queue numbers shown per counter on the display board.
pub const DEFAULT_DISPLAY_NEXT_UP: usize = 3;

/// Upper bound for [`DEFAULT_DISPLAY_NEXT_UP`] overrides.
pub const MAX_DISPLAY_NEXT_UP: usize = 10;

/// Rendered in place of a number when a counter is not serving anyone.
pub const DISPLAY_PLACEHOLDER: &str = "---";

/// Maximum number of characters kept when deriving patient initials.
pub const MAX_INITIALS: usize = 3;
