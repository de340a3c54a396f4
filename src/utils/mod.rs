pub mod text;
pub mod time;

pub use text::escape_key_segment;
pub use time::{api_date, expiry_code, parse_record_date, API_DATE_FORMAT};
