use serde::{Deserialize, Serialize};

/// One remote function and the ordered parameter names it consumes.
///
/// Carries nothing about the response shape; that lives in the reconcile rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub label: String,
    pub function: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl FunctionDescriptor {
    /// Drop repeated parameter names, keeping the first occurrence.
    pub fn dedupe_params(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.params.retain(|p| seen.insert(p.clone()));
    }
}

/// The `{"templates": [...]}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub templates: Vec<FunctionDescriptor>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn by_function(&self, function: &str) -> Option<&FunctionDescriptor> {
        self.templates.iter().find(|d| d.function == function)
    }

    pub fn by_label(&self, label: &str) -> Option<&FunctionDescriptor> {
        self.templates.iter().find(|d| d.label == label)
    }

    /// Match on function name first, then on label.
    pub fn find(&self, key: &str) -> Option<&FunctionDescriptor> {
        let key = key.trim();
        self.by_function(key).or_else(|| self.by_label(key))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|d| d.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut d = FunctionDescriptor {
            label: "x".into(),
            function: "x".into(),
            params: vec!["AC".into(), "L".into(), "AC".into(), "BC".into(), "L".into()],
        };
        d.dedupe_params();
        assert_eq!(d.params, vec!["AC", "L", "BC"]);
    }

    #[test]
    fn test_find_by_function_or_label() {
        let catalog: Catalog = serde_json::from_str(
            r#"{"templates": [{"label": "26 - GetMLE", "function": "GetMLE", "params": ["mic"]}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.find("GetMLE").unwrap().params, vec!["mic"]);
        assert_eq!(catalog.find(" 26 - GetMLE ").unwrap().function, "GetMLE");
        assert!(catalog.find("GetTubing_NL2").is_none());
    }
}
