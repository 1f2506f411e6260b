//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [base] Section Defaults
// ============================================================================

pub mod base {
    pub fn owner() -> String {
        "<YOUR_NAME>".into()
    }

    pub fn url() -> Option<String> {
        None
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn inventory() -> PathBuf {
        "site.json".into()
    }

    pub fn output() -> PathBuf {
        "_site".into()
    }

    pub fn stylesheet() -> PathBuf {
        "assets/css/main.scss".into()
    }

    pub fn state() -> PathBuf {
        ".vignette".into()
    }
}

// ============================================================================
// [preview] Section Defaults
// ============================================================================

pub mod preview {
    pub fn dir() -> String {
        "open-graph".into()
    }

    pub fn layout() -> String {
        "open-graph".into()
    }

    pub fn image_root() -> String {
        "assets/images/open-graph".into()
    }

    pub fn publish_dir() -> String {
        "assets/images/open-graph".into()
    }

    pub fn selector() -> String {
        "#open-graph".into()
    }

    pub fn settle_ms() -> u64 {
        1000
    }

    pub mod viewport {
        pub fn width() -> u32 {
            1200
        }

        pub fn height() -> u32 {
            630
        }
    }
}

// ============================================================================
// [transform] Section Defaults
// ============================================================================

pub mod transform {
    pub fn content_region() -> String {
        "main".into()
    }

    pub fn expand_label() -> String {
        "Click to expand".into()
    }
}
