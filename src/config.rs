//! Parameter file: one `key value` pair per line, whitespace separated.
//!
//! ```text
//! path_to_repos      /home/me/pixel
//! initial_browsedir  /home/me/Pictures
//! save_path          /home/me/pixel/out/
//! window_geometry    1400x900
//! popup_geometry     800x500
//! init_offset        0.5
//! ```
//!
//! Lines with fewer than two tokens, and unknown keys, are skipped.

use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub path_to_repos: String,
    pub initial_browsedir: String,
    /// Prefix prepended to exported file names; usually a directory with a
    /// trailing separator.
    pub save_path: String,
    pub window_geometry: String,
    pub popup_geometry: String,
    /// Default tick/gridline offset.
    pub init_offset: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            path_to_repos: ".".to_string(),
            initial_browsedir: ".".to_string(),
            save_path: "./".to_string(),
            window_geometry: "1200x800".to_string(),
            popup_geometry: "800x500".to_string(),
            init_offset: 0.5,
        }
    }
}

impl Params {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let params = Self::parse(&content);
        tracing::info!(path = %path.display(), save_path = %params.save_path, "Loaded parameters");
        Ok(params)
    }

    pub fn parse(content: &str) -> Self {
        let mut params = Self::default();
        for (number, line) in content.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else {
                if !line.trim().is_empty() {
                    tracing::debug!(line = number + 1, "Skipping malformed parameter line");
                }
                continue;
            };
            match key {
                "path_to_repos" => params.path_to_repos = value.to_string(),
                "initial_browsedir" => params.initial_browsedir = value.to_string(),
                "save_path" => params.save_path = value.to_string(),
                "window_geometry" => params.window_geometry = value.to_string(),
                "popup_geometry" => params.popup_geometry = value.to_string(),
                "init_offset" => match value.parse::<f32>() {
                    Ok(offset) if offset.is_finite() => params.init_offset = offset,
                    _ => tracing::warn!(value, "Invalid init_offset, keeping default"),
                },
                other => tracing::debug!(key = other, "Ignoring unknown parameter"),
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_keys() {
        let params = Params::parse(
            "path_to_repos /repo\n\
             initial_browsedir /pics\n\
             save_path /out/\n\
             window_geometry 1400x900\n\
             popup_geometry 640x480\n\
             init_offset 0.25\n",
        );
        assert_eq!(
            params,
            Params {
                path_to_repos: "/repo".to_string(),
                initial_browsedir: "/pics".to_string(),
                save_path: "/out/".to_string(),
                window_geometry: "1400x900".to_string(),
                popup_geometry: "640x480".to_string(),
                init_offset: 0.25,
            }
        );
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let params = Params::parse("\nsave_path\n# comment line\n   \nsave_path /x/ trailing\ninit_offset abc\n");
        assert_eq!(params.save_path, "/x/");
        assert_eq!(params.init_offset, 0.5);
    }

    #[test]
    fn test_missing_file() {
        assert!(Params::load("/no/such/params.txt").is_err());
    }
}
