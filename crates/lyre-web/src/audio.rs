//! `HtmlAudioElement` media backend.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use lyre_core::{MediaBackend, MediaError, MediaEvent};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, HtmlAudioElement};

use crate::play_guard::PlayGuard;

pub(crate) const AUDIO_ID: &str = "audio-player";

/// Use the page's `<audio id="audio-player">` or append one to `<body>`.
pub(crate) fn get_or_create_audio_element() -> Option<HtmlAudioElement> {
    let document = window()?.document()?;

    if let Some(existing) = document.get_element_by_id(AUDIO_ID) {
        return existing.dyn_into::<HtmlAudioElement>().ok();
    }

    let audio: HtmlAudioElement = document.create_element("audio").ok()?.dyn_into().ok()?;
    audio.set_id(AUDIO_ID);
    audio.set_attribute("preload", "metadata").ok()?;
    document.body()?.append_child(&audio).ok()?;

    Some(audio)
}

/// Best-effort text for a thrown JS value or a rejected promise.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    js_sys::Reflect::get(value, &"message".into())
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

/// `name` of a thrown `DOMException`, if the value has one.
fn js_error_name(value: &JsValue) -> Option<String> {
    js_sys::Reflect::get(value, &"name".into()).ok().and_then(|n| n.as_string())
}

/// Message for the element's current `MediaError`, if it has one.
pub(crate) fn element_error_message(audio: &HtmlAudioElement) -> Option<String> {
    let audio_js = JsValue::from(audio.clone());
    let error_js = js_sys::Reflect::get(&audio_js, &"error".into()).ok()?;
    if error_js.is_null() || error_js.is_undefined() {
        return None;
    }
    let code = js_sys::Reflect::get(&error_js, &"code".into())
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(0.0) as u16;

    Some(
        match code {
            1 => "playback aborted before the source loaded",
            2 => "network error while loading the source",
            3 => "decode error",
            4 => "no supported source found",
            _ => "unable to load the source",
        }
        .to_string(),
    )
}

pub(crate) struct HtmlAudioBackend {
    audio: HtmlAudioElement,
    /// Rejected `play()` promises land here until the next tick.
    events: Rc<RefCell<VecDeque<MediaEvent>>>,
    /// Pause and load supersede any play request still pending.
    plays: PlayGuard,
}

impl HtmlAudioBackend {
    pub(crate) fn new(audio: HtmlAudioElement) -> Self {
        Self {
            audio,
            events: Rc::new(RefCell::new(VecDeque::new())),
            plays: PlayGuard::default(),
        }
    }
}

impl MediaBackend for HtmlAudioBackend {
    fn load(&self, source: &str) -> Result<(), MediaError> {
        self.plays.invalidate();
        self.events.borrow_mut().clear();
        self.audio.set_src(source);
        self.audio.load();
        Ok(())
    }

    fn play(&self) -> Result<(), MediaError> {
        let promise = self
            .audio
            .play()
            .map_err(|e| MediaError::unavailable(&self.audio.src(), js_message(&e)))?;
        let ticket = self.plays.begin();
        let plays = self.plays.clone();
        let events = Rc::clone(&self.events);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                let message = js_message(&e);
                if !plays.should_report(ticket, js_error_name(&e).as_deref()) {
                    log::debug!("lyre: superseded play() rejected: {}", message);
                    return;
                }
                log::warn!("lyre: play() rejected: {}", message);
                events.borrow_mut().push_back(MediaEvent::Failed(message));
            }
        });
        Ok(())
    }

    fn pause(&self) {
        self.plays.invalidate();
        self.events.borrow_mut().clear();
        if let Err(e) = self.audio.pause() {
            log::warn!("lyre: pause failed: {}", js_message(&e));
        }
    }

    fn seek(&self, position_secs: f64) {
        self.audio.set_current_time(position_secs);
    }

    fn set_looping(&self, looping: bool) {
        self.audio.set_loop(looping);
    }

    fn position_secs(&self) -> f64 {
        self.audio.current_time()
    }

    fn duration_secs(&self) -> Option<f64> {
        let duration = self.audio.duration();
        (duration.is_finite() && duration > 0.0).then_some(duration)
    }

    fn take_event(&self) -> Option<MediaEvent> {
        self.events.borrow_mut().pop_front()
    }
}
