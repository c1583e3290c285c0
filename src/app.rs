use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::catalog::Region;
use crate::error::SearchResult;
use crate::map::{MapRenderer, Viewport};
use crate::player::Player;
use crate::quiz::{QuizController, SelectionOutcome};
use crate::resolver::{Resolution, SongResolver};
use crate::search::{JamendoClient, TrackSearch};
use crate::songs::TrackDescriptor;
use crate::ui;

/// What the info panel shows for the current selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelState {
    Empty,
    Loading,
    Track(TrackDescriptor),
    NotFound,
    /// `persistent` errors need a config change; the rest can be retried
    Error { message: String, persistent: bool },
}

/// A finished resolution, tagged with the request token it answers
#[derive(Debug)]
pub struct ResolveEvent {
    pub token: u64,
    pub code: String,
    pub result: SearchResult<Resolution>,
}

/// Application state
pub struct App<S = JamendoClient> {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub quiz: QuizController,
    pub panel: PanelState,
    /// One-line message about the last action (e.g. playback failures)
    pub notice: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Whether the current left-button press has moved (drag, not click)
    dragged: bool,
    /// Full terminal area
    area: Rect,
    resolver: Arc<SongResolver<S>>,
    runtime: Handle,
    player: Player,
    /// Latest issued request token; completions with other tokens are stale
    token: u64,
    events_tx: Sender<ResolveEvent>,
    events_rx: Receiver<ResolveEvent>,
}

impl<S> App<S>
where
    S: TrackSearch + Send + Sync + 'static,
{
    /// Build the app from an already-loaded catalog (inside the renderer)
    pub fn new(
        width: u16,
        height: u16,
        map_renderer: MapRenderer,
        resolver: SongResolver<S>,
        runtime: Handle,
        player: Player,
    ) -> Self {
        let pool = resolver.songs().playable_pool(map_renderer.catalog().regions());
        info!(
            regions = map_renderer.catalog().len(),
            pool = pool.len(),
            "quiz pool ready"
        );
        let (events_tx, events_rx) = mpsc::channel();

        let mut app = Self {
            viewport: Viewport::world(0, 0),
            map_renderer,
            quiz: QuizController::new(pool),
            panel: PanelState::Empty,
            notice: None,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragged: false,
            area: Rect::new(0, 0, width, height),
            resolver: Arc::new(resolver),
            runtime,
            player,
            token: 0,
            events_tx,
            events_rx,
        };
        app.sync_viewport();
        app
    }

    fn map_area(&self) -> Rect {
        ui::layout(self.area, self.quiz.is_active()).map_inner
    }

    /// Keep the viewport's pixel size in step with the map area
    fn sync_viewport(&mut self) {
        let inner = self.map_area();
        // Braille gives 2x4 dots per character
        self.viewport
            .resize(inner.width as usize * 2, inner.height as usize * 4);
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.area = Rect::new(0, 0, width, height);
        self.sync_viewport();
    }

    /// Terminal cell to braille pixel inside the map, if the cell is on the map
    fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let inner = self.map_area();
        if col < inner.x || row < inner.y || col >= inner.right() || row >= inner.bottom() {
            return None;
        }
        let px = (col - inner.x) as i32 * 2;
        let py = (row - inner.y) as i32 * 4;
        Some((px, py))
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Pan with the mouse, scaled so the map follows the pointer
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// Button released: a press that never dragged is a click
    pub fn release(&mut self, col: u16, row: u16) {
        let was_click = self.last_mouse.is_some() && !self.dragged;
        self.last_mouse = None;
        self.dragged = false;
        if was_click {
            self.click(col, row);
        }
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position as a cell inside the map area
    pub fn mouse_cell(&self) -> Option<(u16, u16)> {
        let inner = self.map_area();
        self.mouse_pos.and_then(|(col, row)| {
            self.cell_to_pixel(col, row)
                .map(|_| (col - inner.x, row - inner.y))
        })
    }

    /// Select the country under a terminal cell
    pub fn click(&mut self, col: u16, row: u16) {
        let Some((px, py)) = self.cell_to_pixel(col, row) else {
            return;
        };
        // Center of the character cell
        let (lon, lat) = self.viewport.unproject(px + 1, py + 2);
        let region = self.map_renderer.catalog().region_at(lon, lat).cloned();
        match region {
            Some(region) => self.select(region),
            None => debug!(lon, lat, "click on open water"),
        }
    }

    /// Route a selection through the quiz, then resolve its song
    pub fn select(&mut self, region: Region) {
        self.notice = None;
        let outcome = self.quiz.submit_selection(region.clone());
        if outcome == SelectionOutcome::Correct {
            info!(code = %region.code, score = self.quiz.state().score, "quiz answer correct");
        }
        self.request_resolution(region);
    }

    /// Issue a new token and resolve in the background
    fn request_resolution(&mut self, region: Region) {
        self.token += 1;
        let token = self.token;
        self.panel = PanelState::Loading;

        let resolver = Arc::clone(&self.resolver);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = resolver.resolve(&region).await;
            // Receiver gone means the app is shutting down
            let _ = tx.send(ResolveEvent {
                token,
                code: region.code,
                result,
            });
        });
    }

    /// Drain finished resolutions; call once per frame
    pub fn poll_resolutions(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_resolution(event);
        }
    }

    /// Apply a completion unless a newer selection has superseded it.
    /// Returns whether the panel changed.
    pub fn apply_resolution(&mut self, event: ResolveEvent) -> bool {
        if event.token != self.token {
            debug!(
                code = %event.code,
                token = event.token,
                latest = self.token,
                "discarding stale resolution"
            );
            return false;
        }

        self.panel = match event.result {
            Ok(Resolution::Found(track)) => PanelState::Track(track),
            Ok(Resolution::NotFound) => PanelState::NotFound,
            Err(e) => {
                warn!(code = %event.code, error = %e, "song resolution failed");
                PanelState::Error {
                    message: e.to_string(),
                    persistent: !e.is_transient(),
                }
            }
        };
        true
    }

    /// Re-resolve the current selection after a transient error
    pub fn retry(&mut self) {
        let retryable = matches!(self.panel, PanelState::Error { persistent: false, .. });
        if let (true, Some(region)) = (retryable, self.quiz.selected().cloned()) {
            info!(code = %region.code, "retrying resolution");
            self.request_resolution(region);
        }
    }

    /// Clear the panel and drop any in-flight result
    fn clear_panel(&mut self) {
        self.token += 1;
        self.panel = PanelState::Empty;
        self.notice = None;
    }

    pub fn start_quiz(&mut self) {
        if self.quiz.start() {
            self.clear_panel();
        } else {
            // No prompt line without an active quiz, so say it in the panel
            self.notice = self.quiz.feedback().map(ToString::to_string);
        }
        self.sync_viewport();
    }

    pub fn next_question(&mut self) {
        if self.quiz.is_active() {
            self.quiz.next();
            self.clear_panel();
        }
    }

    pub fn reveal_answer(&mut self) {
        self.quiz.reveal();
    }

    pub fn end_quiz(&mut self) {
        self.quiz.end();
        self.sync_viewport();
    }

    /// The URL `p` would play: the quiz clue first, else the shown track
    pub fn playable_url(&self) -> Option<String> {
        if let Some(target) = self.quiz.clue() {
            return self
                .resolver
                .songs()
                .get(&target.code)
                .and_then(|t| t.audio_url.clone());
        }
        match &self.panel {
            PanelState::Track(track) => track.audio_url.clone(),
            _ => None,
        }
    }

    pub fn play(&mut self) {
        let Some(url) = self.playable_url() else {
            self.notice = Some("Nothing to play".to_string());
            return;
        };
        self.notice = match self.player.play(&url) {
            Ok(()) => Some("▶ Playing".to_string()),
            Err(e) => {
                warn!(error = %e, %url, "could not start player");
                Some(format!("Player failed: {e}"))
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::SearchError;
    use crate::search::{SearchQuery, TrackRecord};
    use crate::songs::{SongTable, TrackSource};
    use glam::DVec2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Search backend that never finds anything
    struct EmptySearch;

    impl TrackSearch for EmptySearch {
        async fn search(&self, _query: &SearchQuery) -> SearchResult<Vec<TrackRecord>> {
            Ok(Vec::new())
        }
    }

    /// Fails with 503 on the first call, then finds one track
    #[derive(Default)]
    struct FlakySearch {
        calls: AtomicUsize,
    }

    impl TrackSearch for FlakySearch {
        async fn search(&self, _query: &SearchQuery) -> SearchResult<Vec<TrackRecord>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SearchError::Upstream { status: 503 });
            }
            Ok(vec![TrackRecord {
                id: "7".into(),
                name: "Aquarela".into(),
                artist_name: "Bossa Trio".into(),
                audio: "https://cdn.example/7.mp3".into(),
                ..TrackRecord::default()
            }])
        }
    }

    /// No credential configured
    struct UnconfiguredSearch;

    impl TrackSearch for UnconfiguredSearch {
        async fn search(&self, _query: &SearchQuery) -> SearchResult<Vec<TrackRecord>> {
            Err(SearchError::Configuration)
        }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x1, y0),
            DVec2::new(x1, y1),
            DVec2::new(x0, y1),
        ]
    }

    fn track(title: &str) -> TrackDescriptor {
        TrackDescriptor {
            title: title.to_string(),
            artist: "Artist".to_string(),
            audio_url: Some(format!("https://example.com/{title}.mp3")),
            cover_url: None,
            share_url: None,
            source: TrackSource::Curated,
        }
    }

    fn app(runtime: &tokio::runtime::Runtime) -> App<EmptySearch> {
        app_with(runtime, EmptySearch)
    }

    fn app_with<S>(runtime: &tokio::runtime::Runtime, search: S) -> App<S>
    where
        S: TrackSearch + Send + Sync + 'static,
    {
        let catalog = Catalog::from_parts(vec![
            (Region::new("FRA", "France"), vec![square(-40.0, -30.0, 40.0, 30.0)]),
            (Region::new("BRA", "Brazil"), vec![square(100.0, -30.0, 140.0, 30.0)]),
        ]);
        let mut songs = SongTable::default();
        songs.insert("FRA", track("fra"));
        App::new(
            120,
            40,
            MapRenderer::new(catalog),
            SongResolver::new(songs, search),
            runtime.handle().clone(),
            Player::from_command_line(Some("definitely-not-a-real-player-binary")),
        )
    }

    fn wait_for_panel<S>(app: &mut App<S>)
    where
        S: TrackSearch + Send + Sync + 'static,
    {
        for _ in 0..200 {
            app.poll_resolutions();
            if app.panel != PanelState::Loading {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("resolution never arrived");
    }

    #[test]
    fn test_pool_is_playable_regions_only() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let app = app(&runtime);
        let codes: Vec<&str> = app.quiz.state().pool.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["FRA"]);
    }

    #[test]
    fn test_click_center_selects_and_resolves() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        let inner = app.map_area();
        // The map is centered on (0, 0), inside France
        app.click(inner.x + inner.width / 2, inner.y + inner.height / 2);

        assert_eq!(app.quiz.selected().map(|r| r.code.as_str()), Some("FRA"));
        wait_for_panel(&mut app);
        assert_eq!(app.panel, PanelState::Track(track("fra")));
    }

    #[test]
    fn test_click_outside_map_is_ignored() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        app.click(119, 39);
        assert!(app.quiz.selected().is_none());
        assert_eq!(app.panel, PanelState::Empty);
    }

    #[test]
    fn test_stale_resolution_is_discarded() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        app.token = 4;
        app.panel = PanelState::Loading;

        let stale = ResolveEvent {
            token: 3,
            code: "BRA".into(),
            result: Ok(Resolution::Found(track("old"))),
        };
        assert!(!app.apply_resolution(stale));
        assert_eq!(app.panel, PanelState::Loading);

        let current = ResolveEvent {
            token: 4,
            code: "FRA".into(),
            result: Ok(Resolution::NotFound),
        };
        assert!(app.apply_resolution(current));
        assert_eq!(app.panel, PanelState::NotFound);
    }

    #[test]
    fn test_errors_map_to_panel_states() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        app.token = 1;
        app.apply_resolution(ResolveEvent {
            token: 1,
            code: "BRA".into(),
            result: Err(SearchError::Configuration),
        });
        assert!(matches!(app.panel, PanelState::Error { persistent: true, .. }));

        app.apply_resolution(ResolveEvent {
            token: 1,
            code: "BRA".into(),
            result: Err(SearchError::Upstream { status: 502 }),
        });
        assert_eq!(
            app.panel,
            PanelState::Error {
                message: "Jamendo HTTP 502".into(),
                persistent: false
            }
        );
    }

    #[test]
    fn test_retry_after_upstream_error_resolves() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app_with(&runtime, FlakySearch::default());
        app.select(Region::new("BRA", "Brazil"));
        wait_for_panel(&mut app);
        assert_eq!(
            app.panel,
            PanelState::Error {
                message: "Jamendo HTTP 503".into(),
                persistent: false
            }
        );

        let before = app.token;
        app.retry();
        assert_eq!(app.token, before + 1);
        assert_eq!(app.panel, PanelState::Loading);
        wait_for_panel(&mut app);

        let PanelState::Track(track) = &app.panel else {
            panic!("expected a track, got {:?}", app.panel);
        };
        assert_eq!(track.title, "Aquarela");
        assert_eq!(track.source, TrackSource::Jamendo);
    }

    #[test]
    fn test_retry_ignores_configuration_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app_with(&runtime, UnconfiguredSearch);
        app.select(Region::new("BRA", "Brazil"));
        wait_for_panel(&mut app);
        assert!(matches!(app.panel, PanelState::Error { persistent: true, .. }));

        let before = app.token;
        let panel = app.panel.clone();
        app.retry();
        assert_eq!(app.token, before);
        assert_eq!(app.panel, panel);
    }

    #[test]
    fn test_second_selection_supersedes_first() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        app.select(Region::new("BRA", "Brazil"));
        let first = app.token;
        app.select(Region::new("FRA", "France"));
        assert!(app.token > first);

        wait_for_panel(&mut app);
        assert_eq!(app.panel, PanelState::Track(track("fra")));
        // Brazil's late answer must not replace France
        app.poll_resolutions();
        assert_eq!(app.panel, PanelState::Track(track("fra")));
    }

    #[test]
    fn test_quiz_clue_and_layout_follow_quiz_mode() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        let plain_height = app.viewport.height;

        app.start_quiz();
        assert!(app.quiz.is_active());
        assert_eq!(app.viewport.height, plain_height - 4);
        assert_eq!(app.playable_url().as_deref(), Some("https://example.com/fra.mp3"));

        app.end_quiz();
        assert_eq!(app.viewport.height, plain_height);
        assert_eq!(app.playable_url(), None);
    }

    #[test]
    fn test_start_with_empty_pool_leaves_notice() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = App::new(
            120,
            40,
            MapRenderer::new(Catalog::from_parts(Vec::new())),
            SongResolver::new(SongTable::default(), EmptySearch),
            runtime.handle().clone(),
            Player::from_command_line(None),
        );
        app.start_quiz();
        assert!(!app.quiz.is_active());
        assert_eq!(app.notice.as_deref(), Some("No countries with a playable song yet"));
    }

    #[test]
    fn test_play_failure_becomes_notice() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        app.play();
        assert_eq!(app.notice.as_deref(), Some("Nothing to play"));

        app.panel = PanelState::Track(track("fra"));
        app.play();
        assert!(app.notice.as_deref().unwrap().starts_with("Player failed"));
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&runtime);
        let inner = app.map_area();
        let (cx, cy) = (inner.x + inner.width / 2, inner.y + inner.height / 2);

        app.press(cx, cy);
        app.handle_drag(cx + 3, cy);
        app.release(cx + 3, cy);
        assert!(app.quiz.selected().is_none());
        assert!(app.viewport.center_lon < 0.0);
    }
}
