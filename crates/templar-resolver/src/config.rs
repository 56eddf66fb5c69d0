//! Engine configuration.

use templar_core::PrimitiveKind;

/// Tunables of an [`Engine`](crate::Engine).
///
/// ```
/// use templar_core::PrimitiveKind;
/// use templar_resolver::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_integral_ladder([PrimitiveKind::Int, PrimitiveKind::LongLong])
///     .with_string_type("const char*")
///     .with_prelude(false);
/// assert_eq!(config.integral_ladder.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Integral kinds tried in order when choosing the width of a runtime
    /// integer. The first kind that holds the value wins.
    pub integral_ladder: Vec<PrimitiveKind>,
    /// Kind given to runtime floating values.
    pub float_type: PrimitiveKind,
    /// Spelling of the type runtime strings resolve to. When the spelling
    /// names nothing, `const char*` is used.
    pub string_type: String,
    /// Complete an underspecified explicit argument list from the call
    /// argument types.
    pub explicit_completion: bool,
    /// Register the built-in prelude when the engine is created.
    pub prelude: bool,
    /// Nesting limit for instantiations triggered while building another.
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            integral_ladder: vec![PrimitiveKind::Int, PrimitiveKind::Long, PrimitiveKind::UnsignedLong],
            float_type: PrimitiveKind::Double,
            string_type: "std::string".to_string(),
            explicit_completion: true,
            prelude: true,
            max_depth: 64,
        }
    }
}

impl EngineConfig {
    pub fn with_integral_ladder(mut self, ladder: impl IntoIterator<Item = PrimitiveKind>) -> Self {
        self.integral_ladder = ladder.into_iter().filter(|k| k.is_integral()).collect();
        self
    }

    pub fn with_float_type(mut self, kind: PrimitiveKind) -> Self {
        self.float_type = kind;
        self
    }

    pub fn with_string_type(mut self, spelling: impl Into<String>) -> Self {
        self.string_type = spelling.into();
        self
    }

    pub fn with_explicit_completion(mut self, enabled: bool) -> Self {
        self.explicit_completion = enabled;
        self
    }

    pub fn with_prelude(mut self, enabled: bool) -> Self {
        self.prelude = enabled;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }
}
