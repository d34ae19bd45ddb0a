//! Page wiring: build the controller, attach listeners, route events.
//!
//! The controller lives in a thread-local. Every listener goes through
//! [`deliver`], which queues the event and drains the queue if nobody else
//! is dispatching. An event raised while the controller is busy (a media
//! callback firing inside `dispatch`) waits in the queue and runs right
//! after the current one finishes.

use std::cell::RefCell;
use std::collections::VecDeque;

use lyre_core::{BarGeometry, MediaError, PlayerConfig, PlayerController, PlayerEvent};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, Element, Event, EventTarget, HtmlAudioElement, MouseEvent};

use crate::audio::{element_error_message, get_or_create_audio_element, HtmlAudioBackend};
use crate::dom::{element, ids, DomView};
use crate::timer::IntervalScheduler;

type WebPlayer = PlayerController<HtmlAudioBackend, DomView, IntervalScheduler>;

thread_local! {
    static PLAYER: RefCell<Option<WebPlayer>> = const { RefCell::new(None) };
    static PENDING: RefCell<VecDeque<PlayerEvent>> = const { RefCell::new(VecDeque::new()) };
}

pub(crate) fn deliver(event: PlayerEvent) {
    PENDING.with(|queue| queue.borrow_mut().push_back(event));
    drain();
}

fn drain() {
    PLAYER.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            log::trace!("lyre: controller busy, event queued");
            return;
        };
        let Some(player) = slot.as_mut() else {
            return;
        };
        while let Some(event) = PENDING.with(|queue| queue.borrow_mut().pop_front()) {
            player.dispatch(event);
        }
    });
}

/// Bind the player to the current page.
///
/// `config_json` is a `PlayerConfig` document; `null` uses the built-in
/// playlist. Mounting twice replaces the previous controller but keeps the
/// listeners, which only ever talk to the current one.
#[wasm_bindgen]
pub fn mount(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json {
        Some(json) => PlayerConfig::from_json_str(&json),
        None => Ok(PlayerConfig::default()),
    }
    .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let document = window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("lyre: no document"))?;
    let audio = get_or_create_audio_element().ok_or_else(|| JsValue::from_str("lyre: cannot create audio element"))?;
    let view = DomView::bind(&document)?;

    let already_mounted = PLAYER.with(|cell| cell.borrow().is_some());
    let player = PlayerController::from_config(&config, HtmlAudioBackend::new(audio.clone()), view, IntervalScheduler)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    PLAYER.with(|cell| *cell.borrow_mut() = Some(player));

    if !already_mounted {
        attach_listeners(&document, &audio)?;
    }
    log::info!("lyre: mounted with {} tracks", config.tracks.len());
    drain();
    Ok(())
}

/// Feed one tagged event, e.g. `{"action": "select_track", "index": 2}`.
#[wasm_bindgen]
pub fn dispatch_json(event_json: &str) -> Result<(), JsValue> {
    let event: PlayerEvent = serde_json::from_str(event_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    deliver(event);
    Ok(())
}

/// Current player state as JSON, or `null` before `mount`.
#[wasm_bindgen]
pub fn snapshot_json() -> Option<String> {
    PLAYER.with(|cell| {
        let slot = cell.try_borrow().ok()?;
        slot.as_ref().map(|player| player.snapshot().to_string())
    })
}

fn listen<F>(target: &EventTarget, kind: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn on_click(document: &Document, id: &str, event: PlayerEvent) -> Result<(), JsValue> {
    let button = element(document, id)?;
    listen(&button, "click", move |_: Event| deliver(event.clone()))
}

fn pointer_x(event: &Event) -> Option<f64> {
    event.dyn_ref::<MouseEvent>().map(|m| f64::from(m.client_x()))
}

/// Report where the bar sits now; the page may have scrolled or resized.
fn measure_bar(bar: &Element) {
    let rect = bar.get_bounding_client_rect();
    deliver(PlayerEvent::ResizeBar {
        left: rect.left(),
        width: rect.width(),
    });
}

fn attach_listeners(document: &Document, audio: &HtmlAudioElement) -> Result<(), JsValue> {
    on_click(document, ids::PLAY_BTN, PlayerEvent::PlayPause)?;
    on_click(document, ids::PREV_BTN, PlayerEvent::Previous)?;
    on_click(document, ids::NEXT_BTN, PlayerEvent::Next)?;
    on_click(document, ids::LOOP_BTN, PlayerEvent::ToggleLoop)?;
    on_click(document, ids::PLAYLIST_BTN, PlayerEvent::TogglePlaylist)?;

    // One delegated listener; rows are rebuilt on every render.
    let song_list = element(document, ids::SONG_LIST)?;
    listen(&song_list, "click", |event: Event| {
        let row = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest("li").ok().flatten());
        let index = row
            .and_then(|li| li.get_attribute("data-index"))
            .and_then(|raw| raw.parse::<usize>().ok());
        if let Some(index) = index {
            deliver(PlayerEvent::SelectTrack { index });
        }
    })?;

    let bar = element(document, ids::PROGRESS_BAR)?;
    let bar_down = bar.clone();
    listen(&bar, "mousedown", move |event: Event| {
        if let Some(pointer_x) = pointer_x(&event) {
            measure_bar(&bar_down);
            deliver(PlayerEvent::BeginSeekDrag { pointer_x });
        }
    })?;
    let bar_click = bar.clone();
    listen(&bar, "click", move |event: Event| {
        if let Some(x) = pointer_x(&event) {
            let rect = bar_click.get_bounding_client_rect();
            let fraction = BarGeometry::new(rect.left(), rect.width()).fraction_at(x);
            deliver(PlayerEvent::Seek { fraction });
        }
    })?;
    listen(document, "mousemove", |event: Event| {
        if let Some(pointer_x) = pointer_x(&event) {
            deliver(PlayerEvent::UpdateSeekDrag { pointer_x });
        }
    })?;
    listen(document, "mouseup", |_: Event| deliver(PlayerEvent::EndSeekDrag))?;

    listen(audio, "loadedmetadata", |_: Event| deliver(PlayerEvent::MetadataLoaded))?;
    listen(audio, "ended", |_: Event| deliver(PlayerEvent::TrackEnded))?;
    let failed = audio.clone();
    listen(audio, "error", move |_: Event| {
        let reason = element_error_message(&failed).unwrap_or_else(|| "unknown media error".to_string());
        deliver(PlayerEvent::from(MediaError::unavailable(&failed.src(), reason)));
    })?;

    Ok(())
}
