#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The buffer handed to the decoder is not a whole frame. The caller
    /// should discard it and wait for the next one.
    #[error("invalid frame length - required={required} received={received}")]
    FrameLength { required: usize, received: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
