use gdevents_codegen::BackendKind;
use serde::{Deserialize, Serialize};

/// Settings of one compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub backend: BackendKind,
    /// Insert profiling markers around every event.
    pub profiling: bool,
}

impl CompileOptions {
    pub fn native() -> Self {
        Self {
            backend: BackendKind::Native,
            ..Self::default()
        }
    }

    pub fn with_profiling(mut self) -> Self {
        self.profiling = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options: CompileOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, CompileOptions::default());
        assert_eq!(options.backend, BackendKind::Script);
        assert!(!options.profiling);
    }

    #[test]
    fn test_camel_case_fields() {
        let options: CompileOptions =
            serde_json::from_str(r#"{"backend":"native","profiling":true}"#).unwrap();
        assert_eq!(options, CompileOptions::native().with_profiling());
    }
}
