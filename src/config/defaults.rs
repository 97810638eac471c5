//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// Top-level Defaults
// ============================================================================

pub fn config_file() -> std::path::PathBuf {
    "marksite.toml".into()
}

pub fn output_dir() -> std::path::PathBuf {
    "public".into()
}

pub fn site_title() -> String {
    "My Marksite Site".into()
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        1313
    }

    pub fn debounce_ms() -> u64 {
        500
    }
}
