use uuid::Uuid;

/// Write-side behavior of a service instance.
///
/// Two services sharing one store may carry different options; the store
/// reads them per call, never holds them.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Identity stamped into `created_by`/`modified_by` and returned by WhoAmI.
    pub caller: Uuid,

    /// Default for the `owning_unit` attribute on create.
    pub owning_unit: Uuid,

    /// Composite display-name template, `{first}`/`{last}` placeholders.
    pub name_template: String,

    /// Reject writes whose reference values point at records that do not exist.
    pub validate_references: bool,
}

impl ServiceOptions {
    pub fn new() -> Self {
        Self {
            caller: Uuid::new_v4(),
            owning_unit: Uuid::new_v4(),
            name_template: "{first} {last}".to_string(),
            validate_references: true,
        }
    }

    /// Set the caller identity
    pub fn caller(mut self, id: Uuid) -> Self {
        self.caller = id;
        self
    }

    /// Set the default owning unit
    pub fn owning_unit(mut self, id: Uuid) -> Self {
        self.owning_unit = id;
        self
    }

    /// Set the composite display-name template
    pub fn name_template(mut self, template: &str) -> Self {
        self.name_template = template.to_string();
        self
    }

    /// Toggle reference validation
    pub fn validate_references(mut self, validate: bool) -> Self {
        self.validate_references = validate;
        self
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::new()
    }
}
