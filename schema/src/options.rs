use serde::Serialize;

/// Identifier casing applied to field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FieldCasing {
    /// Keep the schema name as written.
    #[default]
    Preserve,
    SnakeCase,
    /// The protobuf JSON name, e.g. `firstName`.
    LowerCamel,
}

/// Plugin configuration in effect for a run. Parsed once from the request
/// parameter and shared read-only by every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginOptions {
    pub field_casing:              FieldCasing,
    pub auto_trim_enum_prefix:     bool,
    pub use_integers_for_enums:    bool,
    pub disable_field_description: bool,
    /// `T | None` when true, `_Optional[T]` otherwise.
    pub use_none_union_syntax:     bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        PluginOptions {
            field_casing:              FieldCasing::Preserve,
            auto_trim_enum_prefix:     true,
            use_integers_for_enums:    false,
            disable_field_description: false,
            use_none_union_syntax:     true,
        }
    }
}
