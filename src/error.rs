pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("surface has no 2d drawing context")]
    NoDrawingContext,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(EngineError::invalid_config("x")
            .to_string()
            .starts_with("invalid config:"));
        assert!(EngineError::NoDrawingContext
            .to_string()
            .contains("drawing context"));
    }
}
