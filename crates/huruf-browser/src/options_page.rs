//! Binding of [`OptionsForm`] to the extension's options page.
//!
//! The page has two range inputs (`#size`, `#height`) with percentage labels
//! (`#sizeValue`, `#heightValue`) and a font selector (`#fontFamily`). Every
//! input event updates the labels and writes the full record to the store.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use huruf_core::{OptionsForm, Settings, SettingsStore};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlInputElement, HtmlOptionElement, HtmlSelectElement};

use crate::storage::ChromeStore;

#[derive(Clone)]
struct Controls {
    size: HtmlInputElement,
    height: HtmlInputElement,
    size_value: Element,
    height_value: Element,
    font: HtmlSelectElement,
}

fn by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("options page is missing #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has an unexpected element type")))
}

impl Controls {
    fn find(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            size: by_id(document, "size")?,
            height: by_id(document, "height")?,
            size_value: by_id(document, "sizeValue")?,
            height_value: by_id(document, "heightValue")?,
            font: by_id(document, "fontFamily")?,
        })
    }

    /// Fill the font selector when the page ships it empty.
    fn populate_fonts(&self, document: &Document) -> Result<(), JsValue> {
        if self.font.length() > 0 {
            return Ok(());
        }
        for (value, label) in OptionsForm::font_options() {
            let option: HtmlOptionElement = document.create_element("option")?.dyn_into()?;
            option.set_value(value);
            option.set_text(label);
            self.font.append_child(&option)?;
        }
        Ok(())
    }

    fn render(&self, form: &OptionsForm) {
        let settings = form.settings();
        self.size.set_value(&settings.text_size.to_string());
        self.height.set_value(&settings.line_height.to_string());
        self.font.set_value(settings.font.as_str());
        self.render_labels(form);
    }

    fn render_labels(&self, form: &OptionsForm) {
        self.size_value
            .set_text_content(Some(&form.text_size_label()));
        self.height_value
            .set_text_content(Some(&form.line_height_label()));
    }
}

/// The live options page. Dropping it detaches the input handlers.
pub struct OptionsPage {
    form: Rc<RefCell<OptionsForm>>,
    _listeners: Vec<EventListener>,
}

impl OptionsPage {
    /// Load the stored settings into the page controls and start saving
    /// edits back to `store`.
    pub async fn start(store: ChromeStore) -> Result<Self, JsValue> {
        let document = gloo_utils::document();
        let controls = Controls::find(&document)?;
        controls.populate_fonts(&document)?;

        let form = match store.get_all(&Settings::default().to_record()).await {
            Ok(record) => OptionsForm::from_stored(&record),
            Err(err) => {
                tracing::warn!(error = %err, "could not load settings, showing defaults");
                OptionsForm::default()
            }
        };
        controls.render(&form);
        let form = Rc::new(RefCell::new(form));

        let listeners = vec![
            Self::on_input(&controls, &form, store, &controls.size, |form, c| {
                form.set_text_size_input(&c.size.value());
            }),
            Self::on_input(&controls, &form, store, &controls.height, |form, c| {
                form.set_line_height_input(&c.height.value());
            }),
            Self::on_input(&controls, &form, store, &controls.font, |form, c| {
                let font = form.select_font(&c.font.value());
                c.font.set_value(font.as_str());
            }),
        ];

        Ok(Self {
            form,
            _listeners: listeners,
        })
    }

    pub fn form(&self) -> OptionsForm {
        *self.form.borrow()
    }

    fn on_input(
        controls: &Controls,
        form: &Rc<RefCell<OptionsForm>>,
        store: ChromeStore,
        target: &web_sys::EventTarget,
        update: impl Fn(&mut OptionsForm, &Controls) + 'static,
    ) -> EventListener {
        let controls = controls.clone();
        let form = Rc::clone(form);
        EventListener::new(target, "input", move |_| {
            let record = {
                let mut form = form.borrow_mut();
                update(&mut form, &controls);
                controls.render_labels(&form);
                form.to_record()
            };
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = store.set(&record).await {
                    tracing::warn!(error = %err, "failed to save settings");
                }
            });
        })
    }
}
