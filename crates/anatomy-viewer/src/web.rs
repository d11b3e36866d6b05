//! JavaScript bindings

use anatomy_core::LocationCode;
use anatomy_scene::{Viewer, ViewerLink};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::host;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );
}

type ResizeListener = Closure<dyn FnMut(web_sys::Event)>;

/// A viewer rendering into a canvas on the page
#[wasm_bindgen]
pub struct AnatomyViewer {
    link: ViewerLink,
    resize_listener: Option<ResizeListener>,
}

#[wasm_bindgen]
impl AnatomyViewer {
    /// `new AnatomyViewer("#canvas", "models/thyroid.glb", 1)`
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_selector: String,
        asset_path: String,
        code: Option<u32>,
        config_json: Option<String>,
    ) -> AnatomyViewer {
        let search = web_sys::window()
            .and_then(|window| window.location().search().ok())
            .unwrap_or_default();

        let options = host::viewer_options(
            Some(canvas_selector.clone()),
            asset_path,
            code.map(LocationCode),
            config_json.as_deref(),
            &search,
        );
        let link = Viewer::create(options);
        let resize_listener = install_resize_listener(&link, canvas_selector);

        Self {
            link,
            resize_listener,
        }
    }

    /// Resize the viewport; ignored unless the viewer is running
    pub fn resize(&self, width: u32, height: u32) -> bool {
        self.link.resize(width, height)
    }

    /// Tear the viewer down. Further calls do nothing.
    pub fn dispose(&mut self) {
        if self.link.dispose() {
            tracing::info!("Viewer disposed by host");
        }
        if let Some(listener) = self.resize_listener.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.remove_event_listener_with_callback(
                    "resize",
                    listener.as_ref().unchecked_ref(),
                );
            }
        }
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.link.state().as_str().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> f64 {
        self.link.frames() as f64
    }
}

impl Drop for AnatomyViewer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Client box of `element` as (width, height)
fn client_box(element: &web_sys::Element) -> (i32, i32) {
    (element.client_width(), element.client_height())
}

/// The canvas follows its parent, so the parent's box is the viewport
fn canvas_viewport(selector: &str) -> Option<(u32, u32)> {
    let document = web_sys::window()?.document()?;
    let canvas = document.query_selector(selector).ok()??;
    let parent = canvas.parent_element().map(|parent| client_box(&parent));
    host::viewport_size(parent, client_box(&canvas))
}

fn install_resize_listener(link: &ViewerLink, canvas_selector: String) -> Option<ResizeListener> {
    let window = web_sys::window()?;
    let link = link.clone();
    let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        match canvas_viewport(&canvas_selector) {
            Some((width, height)) => {
                link.resize(width, height);
            }
            None => tracing::debug!("Canvas {} not measurable; resize skipped", canvas_selector),
        }
    });

    match window.add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref()) {
        Ok(()) => Some(listener),
        Err(err) => {
            tracing::warn!("Failed to watch window resizes: {:?}", err);
            None
        }
    }
}
