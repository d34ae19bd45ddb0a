//! DOM rendering of the player page.

use lyre_core::{PlayIcon, PlayerView, PlaylistRow, ProgressView};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement};

/// Element ids the page must provide.
pub(crate) mod ids {
    pub const PLAY_BTN: &str = "play-btn";
    pub const PREV_BTN: &str = "prev-btn";
    pub const NEXT_BTN: &str = "next-btn";
    pub const LOOP_BTN: &str = "loop-btn";
    pub const PROGRESS_BAR: &str = "progress-bar";
    pub const PROGRESS_FILLED: &str = "progress-filled";
    pub const CURRENT_TIME: &str = "current-time";
    pub const TOTAL_DURATION: &str = "total-duration";
    pub const SONG_NAME: &str = "song-name";
    pub const SONG_LIST: &str = "song-list";
    pub const PLAYLIST_BTN: &str = "playlist-btn";
    /// Optional.
    pub const PLAYER_ERROR: &str = "player-error";
}

const PLAYLIST_SELECTOR: &str = ".playlist";

pub(crate) fn element(document: &Document, id: &str) -> Result<Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("lyre: missing #{}", id)))
}

fn html_element(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    element(document, id)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("lyre: #{} is not an HTML element", id)))
}

fn set_style(el: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = el.style().set_property(property, value) {
        log::warn!("lyre: cannot set {}: {:?}", property, e);
    }
}

pub(crate) struct DomView {
    document: Document,
    play_btn: Element,
    loop_btn: HtmlElement,
    song_name: Element,
    song_list: Element,
    progress_filled: HtmlElement,
    current_time: Element,
    total_duration: Element,
    playlist: Option<HtmlElement>,
    error: Option<HtmlElement>,
}

impl DomView {
    pub(crate) fn bind(document: &Document) -> Result<Self, JsValue> {
        let playlist = document
            .query_selector(PLAYLIST_SELECTOR)?
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        if playlist.is_none() {
            log::warn!("lyre: no {} element, playlist toggle does nothing", PLAYLIST_SELECTOR);
        }
        Ok(Self {
            document: document.clone(),
            play_btn: element(document, ids::PLAY_BTN)?,
            loop_btn: html_element(document, ids::LOOP_BTN)?,
            song_name: element(document, ids::SONG_NAME)?,
            song_list: element(document, ids::SONG_LIST)?,
            progress_filled: html_element(document, ids::PROGRESS_FILLED)?,
            current_time: element(document, ids::CURRENT_TIME)?,
            total_duration: element(document, ids::TOTAL_DURATION)?,
            playlist,
            error: html_element(document, ids::PLAYER_ERROR).ok(),
        })
    }

    fn playlist_item(&self, row: &PlaylistRow) -> Result<Element, JsValue> {
        let li = self.document.create_element("li")?;
        li.set_text_content(Some(&row.title));
        li.set_attribute("data-index", &row.index.to_string())?;
        li.class_list().add_1("song-item")?;
        if row.active {
            li.class_list().add_1("active")?;
        }
        Ok(li)
    }
}

impl PlayerView for DomView {
    fn set_play_icon(&mut self, icon: PlayIcon) {
        self.play_btn.set_text_content(Some(icon.glyph()));
    }

    fn set_loop_indicator(&mut self, active: bool) {
        set_style(&self.loop_btn, "color", if active { "red" } else { "white" });
    }

    fn set_track_name(&mut self, name: &str) {
        self.song_name.set_text_content(Some(name));
    }

    fn render_playlist(&mut self, rows: &[PlaylistRow]) {
        self.song_list.set_inner_html("");
        for row in rows {
            let appended = self
                .playlist_item(row)
                .and_then(|li| self.song_list.append_child(&li).map(|_| ()));
            if let Err(e) = appended {
                log::warn!("lyre: cannot render playlist row {}: {:?}", row.index, e);
            }
        }
    }

    fn render_progress(&mut self, progress: &ProgressView) {
        set_style(&self.progress_filled, "width", &format!("{}%", progress.percent));
        self.current_time.set_text_content(Some(&progress.elapsed));
        self.total_duration.set_text_content(Some(&progress.remaining));
    }

    fn set_playlist_visible(&mut self, visible: bool) {
        if let Some(playlist) = &self.playlist {
            set_style(playlist, "display", if visible { "block" } else { "none" });
        }
    }

    fn show_error(&mut self, message: &str) {
        match &self.error {
            Some(el) => {
                el.set_text_content(Some(message));
                set_style(el, "display", "block");
            }
            None => log::error!("lyre: {}", message),
        }
    }

    fn clear_error(&mut self) {
        if let Some(el) = &self.error {
            el.set_text_content(None);
            set_style(el, "display", "none");
        }
    }
}
