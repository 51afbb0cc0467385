use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("coordinate mapper is not calibrated")]
    NotCalibrated,
}
