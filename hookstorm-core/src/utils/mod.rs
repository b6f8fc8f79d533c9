pub mod time_remaining;

pub use time_remaining::format_time_remaining;
