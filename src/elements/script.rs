use crate::binder::field::Fixed;
use crate::binder::registry::FieldDescriptor;

pub(crate) const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::fixed("setup", &["setup"], "boolean"),
    FieldDescriptor::fixed("module", &["module", "name"], "string"),
    FieldDescriptor::fixed("src", &["src", "source", "path"], "string"),
];

/// A script module: the `setup` entry point, or a named module it can import.
/// Source comes from the element text or from `src`.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub setup: Fixed<bool>,
    pub module: Fixed<String>,
    pub src: Fixed<String>,
}

field_slots!(Script {
    "setup" => setup,
    "module" => module,
    "src" => src,
});

impl Script {
    pub fn is_setup(&self) -> bool {
        self.setup.get().copied().unwrap_or(false)
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module
            .get()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}
