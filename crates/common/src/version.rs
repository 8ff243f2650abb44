use std::fmt;

use serde::{Deserialize, Serialize};

/// Build metadata reported by `/_status/version` and `apkshelf version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
    pub build_profile: String,
}

impl BuildInfo {
    pub fn new(name: &str, version: &str) -> Self {
        let build_profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        };
        Self {
            name: name.to_string(),
            version: version.to_string(),
            build_profile: build_profile.to_string(),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.name, self.version, self.build_profile)
    }
}

/// Build info for the calling crate.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_build_info_display() {
        let info = crate::build_info!();
        assert_eq!(info.name, "apkshelf-common");
        assert!(info.to_string().starts_with("apkshelf-common v"));
    }
}
