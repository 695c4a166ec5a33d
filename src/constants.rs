// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3030;
pub const WS_PATH: &str = "socket";
pub const HEALTH_PATH: &str = "health";

// Room membership limits
pub const DEFAULT_MAX_ROOM_SIZE: usize = 10;
pub const MIN_ROOM_SIZE: usize = 2;
pub const MAX_ROOM_SIZE_CEILING: usize = 50;
pub const MAX_ROOM_ID_LENGTH: usize = 100;

// Chat message bounds (in characters)
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 1000;

// Per-connection, per-event rate limiting
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 1000;
pub const DEFAULT_RATE_LIMIT_MAX_EVENTS: u32 = 10;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

// Largest inbound frame accepted before parsing
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024;
