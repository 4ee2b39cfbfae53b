use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntoTupleNameError {
    UnrepresentableStr,
    Reserved,
    EmptyName,
}

impl std::error::Error for IntoTupleNameError {}

impl fmt::Display for IntoTupleNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl IntoTupleNameError {
    pub fn as_str(&self) -> &str {
        match self {
            IntoTupleNameError::UnrepresentableStr => "unrepresentable string found in tuple name",
            IntoTupleNameError::Reserved => "tuple name is reserved by the container format",
            IntoTupleNameError::EmptyName => "no tuple name provided",
        }
    }
}
