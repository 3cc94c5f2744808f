/// Headless figures written next to the subject lists.
pub mod histogram;
