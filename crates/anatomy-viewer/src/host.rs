//! Host parameters: query overrides and configuration passed in by the page

use anatomy_core::{LocationCode, ViewerConfig};
use anatomy_scene::ViewerOptions;
use tracing::{info, warn};

/// Value of `param` in a `?a=1&b=2` query string.
///
/// Only `+`, `%20`, `%3A` and `%2F` are decoded. Other escapes such as `%25`,
/// `%3F` or `%26` are passed through verbatim, so asset URLs that need them
/// should be given to the constructor instead of the query string.
pub fn parse_query_param(search: &str, param: &str) -> Option<String> {
    let search = search.trim_start_matches('?');
    for pair in search.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == param {
                // Only the escapes asset URLs need
                return Some(
                    value
                        .replace('+', " ")
                        .replace("%20", " ")
                        .replace("%3A", ":")
                        .replace("%2F", "/"),
                );
            }
        }
    }
    None
}

/// Viewport size in CSS pixels for a canvas that fits its parent: the
/// parent's client box, or the canvas's own when there is no laid-out parent.
/// `None` while both are collapsed.
pub fn viewport_size(parent: Option<(i32, i32)>, canvas: (i32, i32)) -> Option<(u32, u32)> {
    let measured = |(width, height): (i32, i32)| {
        let width = u32::try_from(width).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(height).ok().filter(|h| *h > 0)?;
        Some((width, height))
    };
    parent.and_then(measured).or_else(|| measured(canvas))
}

/// Build viewer options from what the page passed in. `?asset=` and `?code=`
/// in `search` win over the constructor arguments; a malformed code means no
/// marker, a malformed config means defaults.
pub fn viewer_options(
    canvas: Option<String>,
    asset_path: String,
    code: Option<LocationCode>,
    config_json: Option<&str>,
    search: &str,
) -> ViewerOptions {
    let mut config = match config_json.map(serde_json::from_str::<ViewerConfig>) {
        Some(Ok(config)) => match config.validate() {
            Ok(()) => config,
            Err(err) => {
                warn!("{}; using defaults", err);
                ViewerConfig::default()
            }
        },
        Some(Err(err)) => {
            warn!("Invalid viewer config JSON: {}; using defaults", err);
            ViewerConfig::default()
        }
        None => ViewerConfig::default(),
    };

    config.model.asset_path = match parse_query_param(search, "asset") {
        Some(asset) => {
            info!("Using asset from URL parameter: {}", asset);
            asset
        }
        None => asset_path,
    };

    let code = match parse_query_param(search, "code") {
        Some(text) => {
            let parsed = LocationCode::parse(&text);
            if parsed.is_none() {
                warn!("Ignoring malformed code parameter: {}", text);
            }
            parsed
        }
        None => code,
    };

    ViewerOptions {
        canvas,
        ..ViewerOptions::with_config(config, code)
    }
}
