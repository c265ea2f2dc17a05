//! The intake page: DOM wiring around an [`UploadSession`].
//!
//! # Example
//!
//! ```typescript
//! import init, { IntakeApp } from '@yeskyoko/wasm';
//!
//! await init();
//! const app = new IntakeApp({ threshold: 0.7, log_level: 'debug' });
//! ```
//!
//! The page must contain `#upload` (file input), `#uploadButton`, `#preview`
//! (canvas), `#response`, `#spinner` and `#message`.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Document, File, HtmlCanvasElement, HtmlElement, HtmlInputElement, ImageData};
use yeskyoko_core::{CanvasFrame, PipelineConfig, SessionView, UploadSession, UploadState, Verdict};

use crate::classify::FetchClassifier;
use crate::decode::{context_2d, AnyDecoder, FileSource};
use crate::logging;
use crate::types::{config_from_js, describe_js_error, to_js_error};

type Session = UploadSession<AnyDecoder, FetchClassifier, PageView>;

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has an unexpected element type")))
}

fn set_display(el: &HtmlElement, visible: bool) -> Result<(), JsValue> {
    el.style().set_property("display", if visible { "" } else { "none" })
}

/// The page elements the session renders into.
pub struct PageView {
    config: PipelineConfig,
    upload_input: HtmlInputElement,
    upload_button: HtmlElement,
    preview: HtmlCanvasElement,
    response: HtmlElement,
    spinner: HtmlElement,
    message: HtmlElement,
    reopen_listeners: RefCell<Vec<Closure<dyn FnMut()>>>,
}

impl PageView {
    fn mount(document: &Document, config: PipelineConfig) -> Result<Self, JsValue> {
        Ok(Self {
            config,
            upload_input: element(document, "upload")?,
            upload_button: element(document, "uploadButton")?,
            preview: element(document, "preview")?,
            response: element(document, "response")?,
            spinner: element(document, "spinner")?,
            message: element(document, "message")?,
            reopen_listeners: RefCell::default(),
        })
    }

    fn set_spinner(&self, spinning: bool) -> Result<(), JsValue> {
        let classes = self.spinner.class_list();
        if spinning {
            classes.remove_1("hide")
        } else {
            classes.add_1("hide")
        }
    }

    fn show_message(&self, text: &str) -> Result<(), JsValue> {
        set_display(&self.response, false)?;
        self.message.set_text_content(Some(text));
        set_display(&self.message, true)
    }

    fn render(&self, state: &UploadState) -> Result<(), JsValue> {
        match state {
            UploadState::Reading => {
                self.upload_button.style().set_property("visibility", "hidden")?;
                set_display(&self.message, false)?;
                self.response.style().set_property("background-image", "")?;
                set_display(&self.response, true)?;
                self.set_spinner(true)
            }
            UploadState::Rendered(verdict) => {
                self.set_spinner(false)?;
                match verdict.asset(&self.config) {
                    Some(asset) => {
                        set_display(&self.message, false)?;
                        self.response
                            .style()
                            .set_property("background-image", &format!("url(\"{asset}\")"))?;
                        set_display(&self.response, true)
                    }
                    None => self.show_message(&self.config.no_face_message),
                }
            }
            UploadState::Errored(message) => {
                self.set_spinner(false)?;
                self.show_message(message)
            }
            _ => Ok(()),
        }
    }

    fn draw(&self, frame: &CanvasFrame) -> Result<(), JsValue> {
        let side = frame.side();
        self.preview.set_width(side);
        self.preview.set_height(side);
        let rgba = frame.to_rgba();
        let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(rgba.as_slice()), side, side)?;
        context_2d(&self.preview)?.put_image_data(&image, 0.0, 0.0)
    }

    fn enable_reopen(&self) -> Result<(), JsValue> {
        self.upload_button.style().set_property("visibility", "hidden")?;
        let targets: [&HtmlElement; 3] = [&self.preview, &self.response, &self.message];
        let mut listeners = self.reopen_listeners.borrow_mut();
        for target in targets {
            let input = self.upload_input.clone();
            let listener = Closure::<dyn FnMut()>::new(move || input.click());
            target.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;
            listeners.push(listener);
        }
        Ok(())
    }
}

impl SessionView for PageView {
    fn state_changed(&self, state: &UploadState) {
        if let Err(err) = self.render(state) {
            warn!(error = %describe_js_error(&err), "failed to render state");
        }
    }

    fn frame_ready(&self, frame: &CanvasFrame) {
        if let Err(err) = self.draw(frame) {
            warn!(error = %describe_js_error(&err), "failed to draw preview");
        }
    }

    fn first_render(&self) {
        if let Err(err) = self.enable_reopen() {
            warn!(error = %describe_js_error(&err), "failed to attach click handlers");
        }
    }
}

/// The intake page controller.
///
/// Constructing it installs console logging, binds the page elements and
/// starts listening for file selections.
#[wasm_bindgen]
pub struct IntakeApp {
    session: Rc<Session>,
    upload_input: HtmlInputElement,
    on_change: Closure<dyn FnMut()>,
}

#[wasm_bindgen]
impl IntakeApp {
    /// Mount onto the current document.
    ///
    /// `config` is an optional partial `PipelineConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<IntakeApp, JsValue> {
        let config = config_from_js(config)?;
        if let Err(err) = logging::init(&config.log_level) {
            web_sys::console::warn_1(&format!("console logging not installed: {err}").into());
        }

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let view = PageView::mount(&document, config.clone())?;
        let upload_input = view.upload_input.clone();
        let classifier = FetchClassifier::new(window, config.endpoint.clone());
        let session = Rc::new(UploadSession::new(config, AnyDecoder::detect(), classifier, view));

        let on_change = {
            let session = Rc::clone(&session);
            let input = upload_input.clone();
            Closure::<dyn FnMut()>::new(move || {
                let Some(file) = input.files().and_then(|files| files.get(0)) else {
                    return;
                };
                let session = Rc::clone(&session);
                spawn_local(async move {
                    // Failures are already rendered by the session.
                    let _ = session.submit(FileSource::new(file)).await;
                });
            })
        };
        upload_input.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref())?;

        info!(endpoint = %session.config().endpoint, "intake page mounted");
        Ok(IntakeApp {
            session,
            upload_input,
            on_change,
        })
    }

    /// Current `UploadState` as `{ state, detail }`.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.session.state())?)
    }

    /// Whether a verdict has been shown since the page loaded.
    #[wasm_bindgen(getter)]
    pub fn has_interacted(&self) -> bool {
        self.session.has_interacted()
    }

    /// Run an upload cycle for a file obtained some other way, e.g. drag and drop.
    ///
    /// Resolves with the verdict, rejects with the error message.
    pub fn submit(&self, file: File) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            let verdict: Verdict = session
                .submit(FileSource::new(file))
                .await
                .map_err(to_js_error)?;
            Ok(serde_wasm_bindgen::to_value(&verdict)?)
        })
    }
}

impl Drop for IntakeApp {
    fn drop(&mut self) {
        let _ = self
            .upload_input
            .remove_event_listener_with_callback("change", self.on_change.as_ref().unchecked_ref());
    }
}
