/// Policy for interpreting `GetProcAddress` queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Query values below this threshold are ordinals, anything else is a pointer to a name.
    ///
    /// This relies on the loader never placing readable data in the lowest pages of the address
    /// space. Hosts with a different address space layout should adjust it.
    pub ordinal_threshold: u64,

    /// Names ending with this character are retried with [Self::mangling_suffixes] when no
    /// export matches exactly.
    pub mangling_marker: char,

    /// Suffixes tried in order for names ending with [Self::mangling_marker].
    pub mangling_suffixes: Vec<String>,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            ordinal_threshold: 0x10000,
            mangling_marker: '@',
            mangling_suffixes: vec!["Z".to_string(), "XZ".to_string()],
        }
    }
}

/// Rules for deciding whether two module names refer to the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRules {
    pub case_sensitive: bool,

    /// Extension assumed when a requested name has none, e.g. `kernel32` for `kernel32.dll`.
    pub default_extension: Option<String>,
}

impl NameRules {
    /// Windows module names are case insensitive and default to the `.dll` extension.
    pub fn windows() -> Self {
        Self {
            case_sensitive: false,
            default_extension: Some("dll".to_string()),
        }
    }

    /// Normalize a module name into the key used to identify the module. Directory components
    /// are dropped.
    pub fn normalize(&self, name: &str) -> String {
        let file_name = name.rsplit(['\\', '/']).next().unwrap_or(name);
        let mut normalized = if self.case_sensitive {
            file_name.to_string()
        } else {
            file_name.to_lowercase()
        };

        if let Some(extension) = &self.default_extension {
            if !normalized.contains('.') {
                normalized.push('.');
                normalized.push_str(extension);
            }
        }

        normalized
    }

    /// The name with its directory components and extension removed, keeping its case. This is
    /// the prefix used for fully qualified procedure names.
    pub fn provenance(&self, name: &str) -> String {
        let file_name = name.rsplit(['\\', '/']).next().unwrap_or(name);
        match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        }
    }
}

impl Default for NameRules {
    fn default() -> Self {
        Self::windows()
    }
}
