//! Unique-profile derivation: when `use_unique_profile` is on and no
//! `--user-data-dir=` is already present, derive `<base>/<slug(name)>`,
//! create it, and return the flag to prepend plus the absolute, lowercased
//! form used later as the `profile_flag` matching token.

use crate::launcher::error::LaunchError;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Lowercases the name and replaces runs of non-`[a-z0-9._-]` with `-`,
/// stripping leading/trailing `-_.`.
pub fn slug(name: &str) -> String {
    let re = Regex::new(r"[^a-z0-9._-]+").expect("static regex is valid");
    let lowered = name.to_lowercase();
    let replaced = re.replace_all(&lowered, "-");
    let trimmed = replaced.trim_matches(|c| c == '-' || c == '_' || c == '.');
    if trimmed.is_empty() {
        "service".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn already_has_profile_flag(args: &[String]) -> bool {
    args.iter().any(|arg| arg.starts_with("--user-data-dir"))
}

/// Result of deriving a unique profile: the directory created, the flag to
/// prepend to argv, and its lowercased absolute form used as the matching token.
pub struct DerivedProfile {
    pub dir: PathBuf,
    pub flag_arg: String,
    pub profile_flag: String,
}

pub fn derive(base_dir: &Path, service_name: &str) -> Result<DerivedProfile, LaunchError> {
    let dir = base_dir.join(slug(service_name));
    std::fs::create_dir_all(&dir)
        .map_err(|err| LaunchError::ProfileDirUncreatable(dir.clone(), err))?;

    let abs = dir
        .canonicalize()
        .unwrap_or_else(|_| dir.clone())
        .display()
        .to_string();
    let flag_arg = format!("--user-data-dir={abs}");
    let profile_flag = flag_arg.to_lowercase();

    Ok(DerivedProfile {
        dir,
        flag_arg,
        profile_flag,
    })
}
