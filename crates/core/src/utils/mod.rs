pub mod numeric;
pub mod time_utils;
