// Uses
use chrono_tz::{Tz, US::Eastern};
use serenity::all::Colour;

// Constants
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MAIN_COLOUR: Colour = Colour(0xbf5c4e);

// Environment Keys
pub const TOKEN_KEY: &str = "DISCORD_TOKEN";
pub const DATABASE_URL_KEY: &str = "DATABASE_URL";
pub const ADMIN_ID_KEYS: [&str; 5] = ["ADMIN_ID", "ADMIN_ID_2", "ADMIN_ID_3", "ADMIN_ID_4", "ADMIN_ID_5"];
pub const RATE_LIMIT_MAX_OPERATIONS_KEY: &str = "RATE_LIMIT_MAX_OPERATIONS";
pub const RATE_LIMIT_PERIOD_KEY: &str = "RATE_LIMIT_PERIOD_MS";
pub const ADMIN_PANEL_TIMEOUT_KEY: &str = "ADMIN_PANEL_TIMEOUT_SECS";

// Operational Constants
// Discord allows 50/s, keep a small buffer
pub const DEFAULT_MAX_OPERATIONS: u32 = 45;
pub const DEFAULT_RATE_LIMIT_PERIOD_MILLIS: u64 = 1000;
pub const DEFAULT_ADMIN_PANEL_TIMEOUT_SECS: u64 = 180;
pub const ROLL_MIN: i32 = 1;
pub const ROLL_MAX: i32 = 100;
pub const RECENT_ROLLS_SHOWN: usize = 5;
pub const PLATFORM_ATTEMPTS: u32 = 3;
pub const PLATFORM_RETRY_FALLBACK_SECS: u64 = 5;

// Display Constants
pub const DISPLAY_TIMEZONE: Tz = Eastern;
pub const TIME_FORMAT: &str = "%I:%M%p %m/%d/%y";
pub const NO_ROLLS_YET: &str = "No rolls yet";
pub const NO_ROLLS_LINE: &str = "\u{1f3b2} No rolls yet. Be the first to click!";
pub const PROMPT_TEXT: &str = "\u{1f3b2} Click the button to roll!";
pub const ROLL_BUTTON_LABEL: &str = "\u{1f3b2} CLICK HERE TO ROLL! \u{1f3b2}";
pub const STATS_BUTTON_LABEL: &str = "\u{1f4ca}";
pub const ALREADY_ROLLED: &str = "\u{203c}\u{fe0f} You've already rolled on this item \u{203c}\u{fe0f}";
pub const PROMPT_NOT_READY: &str =
	"\u{23f3} This roll is still being set up. Please try again in a moment.";
pub const PROMPT_SETUP_FAILED: &str = "\u{26a0}\u{fe0f} This roll couldn't be set up. Please post a new one.";
pub const GENERIC_FAILURE: &str = "\u{26a0}\u{fe0f} Something went wrong. Please try again later.";

// Utility Constants
pub const SECONDS_PER_MINUTE: u64 = 60;
