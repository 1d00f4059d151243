use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Moving average window must be at least 1, got {0}")]
    InvalidWindow(usize),
}
