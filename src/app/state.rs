use crate::api::client::ApiClient;
use crate::app::search::{CategoryFilter, filter_indices, quick_search_indices};
use crate::favorites::{FavoriteEntry, FavoritesRegistry};
use crate::listing::assemble::{DetailOutcome, is_valid_id, load_categories, load_detail, load_listing};
use crate::listing::model::BusinessRecord;
use crate::listing::normalize::Normalizer;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

pub const QUICK_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const QUICK_SEARCH_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Insert,
    Navigate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browse,
    Detail,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailTab {
    Products,
    Location,
}

/// Results of background fetches, tagged with the generation that requested them.
#[derive(Debug)]
pub enum AppEvent {
    Listing {
        generation: u64,
        records: Vec<BusinessRecord>,
        categories: Vec<String>,
    },
    Detail {
        generation: u64,
        outcome: DetailOutcome,
    },
}

/// Everything a background fetch needs, cloned into each task.
#[derive(Debug, Clone)]
pub struct Services {
    pub client: ApiClient,
    pub normalizer: Normalizer,
    pub maps_api_key: Option<String>,
    pub login_url: &'static str,
}

/// One cancellable fetch slot. Starting a new fetch cancels the previous one,
/// and any result from an older generation is discarded.
#[derive(Debug, Default)]
struct Fetch {
    generation: u64,
    task: Option<JoinHandle<()>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl Fetch {
    fn start<F, Fut>(&mut self, outbound: Option<mpsc::UnboundedSender<AppEvent>>, make: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = AppEvent> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let (tx, mut rx) = oneshot::channel::<()>();
        let work = make(generation);

        let handle = tokio::spawn(async move {
            tokio::select! {
                event = work => {
                    if let Some(out) = outbound {
                        let _ = out.send(event);
                    }
                }
                _ = &mut rx => {}
            }
        });

        self.cancel_tx = Some(tx);
        self.task = Some(handle);
        generation
    }

    fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.task.take() {
            h.abort();
        }
        self.generation += 1;
    }

    /// Accepts a result once; later results for the same generation are stale.
    fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.task.is_none() {
            return false;
        }
        self.cancel_tx = None;
        self.task = None;
        true
    }

    fn in_flight(&self) -> bool {
        self.task.is_some()
    }
}

#[derive(Debug)]
pub struct BrowseState {
    pub input: String,
    pub mode: SearchMode,
    pub category: CategoryFilter,
    pub categories: Vec<String>,
    pub filtered_indices: Vec<usize>,
    pub selected_index: usize,
}

#[derive(Debug)]
pub struct OverlayState {
    pub open: bool,
    pub input: String,
    pub results: Vec<usize>,
    pub selected_index: usize,
    pub needs_filter: bool,
    pub last_input_change: Instant,
}

#[derive(Debug)]
pub struct DetailState {
    pub business_id: Option<String>,
    pub record: Option<BusinessRecord>,
    pub tab: DetailTab,
    pub message: Option<String>,
    pub return_to: View,
    fetch: Fetch,
}

#[derive(Debug)]
pub struct App {
    pub view: View,
    pub status: String,
    pub listing: Vec<BusinessRecord>,
    pub browse: BrowseState,
    pub overlay: OverlayState,
    pub detail: DetailState,
    pub favorites: FavoritesRegistry,
    pub favorites_selected: usize,
    pub services: Services,
    listing_fetch: Fetch,
    update_tx: Option<mpsc::UnboundedSender<AppEvent>>,
}

impl App {
    pub fn new(services: Services, favorites: FavoritesRegistry) -> Self {
        Self {
            view: View::Browse,
            status: "Starting".into(),
            listing: Vec::new(),
            browse: BrowseState {
                input: String::new(),
                mode: SearchMode::Insert,
                category: CategoryFilter::All,
                categories: Vec::new(),
                filtered_indices: Vec::new(),
                selected_index: 0,
            },
            overlay: OverlayState {
                open: false,
                input: String::new(),
                results: Vec::new(),
                selected_index: 0,
                needs_filter: false,
                last_input_change: Instant::now(),
            },
            detail: DetailState {
                business_id: None,
                record: None,
                tab: DetailTab::Products,
                message: None,
                return_to: View::Browse,
                fetch: Fetch::default(),
            },
            favorites,
            favorites_selected: 0,
            services,
            listing_fetch: Fetch::default(),
            update_tx: None,
        }
    }

    pub fn set_update_sender(&mut self, tx: mpsc::UnboundedSender<AppEvent>) {
        self.update_tx = Some(tx);
    }

    pub fn listing_loading(&self) -> bool {
        self.listing_fetch.in_flight()
    }

    pub fn detail_loading(&self) -> bool {
        self.detail.fetch.in_flight()
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Listing {
                generation,
                records,
                categories,
            } => self.on_listing(generation, records, categories),
            AppEvent::Detail { generation, outcome } => self.on_detail(generation, outcome),
        }
    }

    // --- Listing ---

    pub fn reload_listing(&mut self) {
        let services = self.services.clone();
        self.listing_fetch.start(self.update_tx.clone(), move |generation| async move {
            let records = load_listing(&services.client, &services.normalizer).await;
            let categories = load_categories(&services.client, &records).await;
            AppEvent::Listing {
                generation,
                records,
                categories,
            }
        });
        self.status = "Loading businesses…".into();
    }

    fn on_listing(&mut self, generation: u64, records: Vec<BusinessRecord>, categories: Vec<String>) {
        if !self.listing_fetch.accept(generation) {
            tracing::debug!(generation, "dropping stale listing result");
            return;
        }

        self.listing = records;
        self.browse.categories = categories;
        let vanished = matches!(
            &self.browse.category,
            CategoryFilter::Exact(name) if !self.browse.categories.contains(name)
        );
        if vanished {
            self.browse.category = CategoryFilter::All;
        }
        self.apply_filter();
        if self.overlay.open {
            self.overlay.needs_filter = true;
        }

        self.status = if self.listing.is_empty() {
            "No businesses available".into()
        } else {
            format!("Loaded {} businesses", self.listing.len())
        };
    }

    // --- Browse search ---

    pub fn on_input(&mut self, ch: char) {
        self.browse.input.push(ch);
        self.apply_filter();
    }

    pub fn on_backspace(&mut self) {
        self.browse.input.pop();
        self.apply_filter();
    }

    pub fn on_delete(&mut self) {
        self.browse.input.clear();
        self.apply_filter();
    }

    pub fn next_category(&mut self) {
        self.shift_category(1);
    }

    pub fn prev_category(&mut self) {
        self.shift_category(-1);
    }

    /// Cycles All -> each category -> All.
    fn shift_category(&mut self, delta: isize) {
        let slots = self.browse.categories.len() as isize + 1;
        let current = match &self.browse.category {
            CategoryFilter::All => 0,
            CategoryFilter::Exact(name) => self
                .browse
                .categories
                .iter()
                .position(|c| c == name)
                .map_or(0, |i| i as isize + 1),
        };
        let next = (current + delta).rem_euclid(slots);
        self.browse.category = if next == 0 {
            CategoryFilter::All
        } else {
            CategoryFilter::Exact(self.browse.categories[next as usize - 1].clone())
        };
        self.apply_filter();
        self.status = format!("Category: {}", self.browse.category.label());
    }

    fn apply_filter(&mut self) {
        self.browse.filtered_indices =
            filter_indices(&self.listing, &self.browse.input, &self.browse.category);

        let count = self.browse.filtered_indices.len();
        if count == 0 {
            self.browse.selected_index = 0;
        } else {
            self.browse.selected_index = self.browse.selected_index.min(count - 1);
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.browse.filtered_indices.is_empty() {
            return;
        }
        let len = self.browse.filtered_indices.len() as isize;
        let idx = (self.browse.selected_index as isize + delta).clamp(0, len - 1);
        self.browse.selected_index = idx as usize;
    }

    pub fn jump_to_top(&mut self) {
        self.browse.selected_index = 0;
    }

    pub fn jump_to_bottom(&mut self) {
        if !self.browse.filtered_indices.is_empty() {
            self.browse.selected_index = self.browse.filtered_indices.len() - 1;
        }
    }

    pub fn selected_record(&self) -> Option<&BusinessRecord> {
        self.browse
            .filtered_indices
            .get(self.browse.selected_index)
            .and_then(|&i| self.listing.get(i))
    }

    pub fn enter_detail(&mut self) {
        if let Some(id) = self.selected_record().map(|r| r.id.clone()) {
            self.open_detail(id, View::Browse);
        }
    }

    // --- Favorites ---

    pub fn toggle_selected_favorite(&mut self) {
        if let Some(record) = self.selected_record().cloned() {
            self.toggle_favorite(&record);
        }
    }

    pub fn toggle_detail_favorite(&mut self) {
        if let Some(record) = self.detail.record.clone() {
            self.toggle_favorite(&record);
        }
    }

    fn toggle_favorite(&mut self, record: &BusinessRecord) {
        self.status = match self.favorites.toggle(record) {
            Ok(true) => format!("Saved {} to favorites", record.name),
            Ok(false) => format!("Removed {} from favorites", record.name),
            Err(e) => {
                tracing::error!(id = %record.id, error = %e, "favorites update failed");
                format!("Could not update favorites: {e}")
            }
        };
    }

    pub fn open_favorites(&mut self) {
        self.view = View::Favorites;
        self.clamp_favorites_selection();
        self.status = if self.favorites.is_writable() {
            format!("{} favorites", self.favorites.len())
        } else {
            format!("{} favorites (saving disabled, see log)", self.favorites.len())
        };
    }

    pub fn close_favorites(&mut self) {
        self.view = View::Browse;
    }

    pub fn selected_favorite(&self) -> Option<&FavoriteEntry> {
        self.favorites.list().get(self.favorites_selected)
    }

    pub fn move_favorites_selection(&mut self, delta: isize) {
        let len = self.favorites.len() as isize;
        if len == 0 {
            return;
        }
        self.favorites_selected = (self.favorites_selected as isize + delta).clamp(0, len - 1) as usize;
    }

    pub fn remove_selected_favorite(&mut self) {
        let Some((id, name)) = self.selected_favorite().map(|f| (f.id.clone(), f.name.clone())) else {
            return;
        };
        self.status = match self.favorites.remove(&id) {
            Ok(_) => format!("Removed {name} from favorites"),
            Err(e) => {
                tracing::error!(%id, error = %e, "favorites update failed");
                format!("Could not update favorites: {e}")
            }
        };
        self.clamp_favorites_selection();
    }

    pub fn open_selected_favorite(&mut self) {
        if let Some(id) = self.selected_favorite().map(|f| f.id.clone()) {
            self.open_detail(id, View::Favorites);
        }
    }

    fn clamp_favorites_selection(&mut self) {
        self.favorites_selected = self
            .favorites_selected
            .min(self.favorites.len().saturating_sub(1));
    }

    // --- Detail ---

    pub fn open_detail(&mut self, id: String, return_to: View) {
        self.detail.fetch.cancel();
        self.detail.record = None;
        self.detail.tab = DetailTab::Products;
        self.detail.return_to = return_to;
        self.view = View::Detail;

        if !is_valid_id(id.trim()) {
            self.detail.business_id = None;
            self.detail.message = Some("Error: invalid business id".into());
            return;
        }

        self.detail.business_id = Some(id.clone());
        self.detail.message = None;
        let services = self.services.clone();
        self.detail.fetch.start(self.update_tx.clone(), move |generation| async move {
            let outcome = load_detail(&services.client, &services.normalizer, &id).await;
            AppEvent::Detail { generation, outcome }
        });
        self.status = "Loading details…".into();
    }

    pub fn exit_detail(&mut self) {
        self.detail.fetch.cancel();
        self.view = self.detail.return_to;
        self.detail.business_id = None;
        self.detail.record = None;
        self.detail.message = None;
    }

    fn on_detail(&mut self, generation: u64, outcome: DetailOutcome) {
        if self.view != View::Detail || !self.detail.fetch.accept(generation) {
            tracing::debug!(generation, "dropping stale detail result");
            return;
        }

        match outcome {
            DetailOutcome::Loaded(record) => {
                self.status = format!("Detail: {}", record.name);
                self.detail.record = Some(*record);
            }
            DetailOutcome::Inactive => {
                self.exit_detail();
                self.view = View::Browse;
                self.status = "That business is not currently listed".into();
            }
            DetailOutcome::InvalidId => {
                self.detail.message = Some("Error: invalid business id".into());
            }
            DetailOutcome::Failed(cause) => {
                self.detail.message = Some("Could not load this business.".into());
                self.status = format!("Load failed: {cause}");
            }
        }
    }

    pub fn toggle_detail_tab(&mut self) {
        self.detail.tab = match self.detail.tab {
            DetailTab::Products => DetailTab::Location,
            DetailTab::Location => DetailTab::Products,
        };
    }

    // --- Quick search overlay ---

    pub fn open_overlay(&mut self) {
        self.overlay.open = true;
        self.overlay.input.clear();
        self.overlay.results.clear();
        self.overlay.selected_index = 0;
        self.overlay.needs_filter = false;
    }

    pub fn close_overlay(&mut self) {
        self.overlay.open = false;
    }

    pub fn overlay_input(&mut self, ch: char) {
        self.overlay.input.push(ch);
        self.mark_overlay_changed();
    }

    pub fn overlay_backspace(&mut self) {
        self.overlay.input.pop();
        self.mark_overlay_changed();
    }

    fn mark_overlay_changed(&mut self) {
        self.overlay.needs_filter = true;
        self.overlay.last_input_change = Instant::now();
    }

    pub fn maybe_apply_overlay_filter(&mut self, debounce: Duration) {
        if self.overlay.needs_filter && self.overlay.last_input_change.elapsed() >= debounce {
            let mut results = quick_search_indices(&self.listing, &self.overlay.input);
            results.truncate(QUICK_SEARCH_LIMIT);
            self.overlay.results = results;
            self.overlay.selected_index = 0;
            self.overlay.needs_filter = false;
        }
    }

    pub fn move_overlay_selection(&mut self, delta: isize) {
        let len = self.overlay.results.len() as isize;
        if len == 0 {
            return;
        }
        self.overlay.selected_index =
            (self.overlay.selected_index as isize + delta).clamp(0, len - 1) as usize;
    }

    pub fn open_overlay_selection(&mut self) {
        let id = self
            .overlay
            .results
            .get(self.overlay.selected_index)
            .and_then(|&i| self.listing.get(i))
            .map(|r| r.id.clone());
        if let Some(id) = id {
            let return_to = if self.view == View::Detail {
                self.detail.return_to
            } else {
                self.view
            };
            self.close_overlay();
            self.open_detail(id, return_to);
        }
    }

    /// Cancels outstanding fetches at session end.
    pub fn shutdown(&mut self) {
        self.listing_fetch.cancel();
        self.detail.fetch.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::store::MemoryStore;
    use crate::listing::normalize::PLACEHOLDER_IMAGE;

    fn services() -> Services {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        Services {
            client,
            normalizer: Normalizer::new("http://127.0.0.1:9"),
            maps_api_key: None,
            login_url: "http://localhost:3001",
        }
    }

    fn record(id: &str, name: &str, kind: &str) -> BusinessRecord {
        BusinessRecord {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            description: format!("{name} description"),
            address: "Yogyakarta".into(),
            phone: None,
            location_url: None,
            opening_time: "09:00".into(),
            closing_time: "17:00".into(),
            status: Some("Active".into()),
            cover_image: PLACEHOLDER_IMAGE.into(),
            images: Vec::new(),
            document: None,
            products: Vec::new(),
        }
    }

    fn app() -> App {
        App::new(services(), FavoritesRegistry::open(Box::new(MemoryStore::default())))
    }

    /// Delivers a listing through the same path a background fetch would.
    fn loaded_app() -> App {
        let mut app = app();
        app.listing_fetch.task = Some(tokio::spawn(async {}));
        let generation = app.listing_fetch.generation;
        app.handle_event(AppEvent::Listing {
            generation,
            records: vec![
                record("1", "Batik Sari", "Textiles"),
                record("2", "Kopi Kita", "Food"),
                record("3", "Warung Bu Sri", "Food"),
            ],
            categories: vec!["Textiles".into(), "Food".into()],
        });
        app
    }

    #[tokio::test]
    async fn listing_result_populates_browse_view() {
        let app = loaded_app();
        assert_eq!(app.browse.filtered_indices, [0, 1, 2]);
        assert_eq!(app.status, "Loaded 3 businesses");
        assert!(!app.listing_loading());
    }

    #[tokio::test]
    async fn typing_filters_synchronously() {
        let mut app = loaded_app();
        for ch in "kopi".chars() {
            app.on_input(ch);
        }
        assert_eq!(app.browse.filtered_indices, [1]);
        app.on_delete();
        assert_eq!(app.browse.filtered_indices.len(), 3);
    }

    #[tokio::test]
    async fn category_cycles_through_all_and_back() {
        let mut app = loaded_app();
        app.next_category();
        assert_eq!(app.browse.category, CategoryFilter::Exact("Textiles".into()));
        assert_eq!(app.browse.filtered_indices, [0]);
        app.next_category();
        assert_eq!(app.browse.filtered_indices, [1, 2]);
        app.next_category();
        assert_eq!(app.browse.category, CategoryFilter::All);
        app.prev_category();
        assert_eq!(app.browse.category, CategoryFilter::Exact("Food".into()));
    }

    #[tokio::test]
    async fn toggling_a_favorite_from_browse() {
        let mut app = loaded_app();
        app.move_selection(1);
        app.toggle_selected_favorite();
        assert!(app.favorites.is_favorite("2"));
        assert_eq!(app.status, "Saved Kopi Kita to favorites");

        app.toggle_selected_favorite();
        assert!(!app.favorites.is_favorite("2"));
    }

    #[tokio::test]
    async fn stale_detail_results_are_dropped() {
        let mut app = loaded_app();
        app.open_detail("1".into(), View::Browse);
        let stale = app.detail.fetch.generation;
        app.exit_detail();

        app.handle_event(AppEvent::Detail {
            generation: stale,
            outcome: DetailOutcome::Loaded(Box::new(record("1", "Batik Sari", "Textiles"))),
        });
        assert_eq!(app.view, View::Browse);
        assert!(app.detail.record.is_none());

        app.open_detail("2".into(), View::Browse);
        app.handle_event(AppEvent::Detail {
            generation: stale,
            outcome: DetailOutcome::Loaded(Box::new(record("1", "Batik Sari", "Textiles"))),
        });
        assert!(app.detail.record.is_none());

        let current = app.detail.fetch.generation;
        app.handle_event(AppEvent::Detail {
            generation: current,
            outcome: DetailOutcome::Loaded(Box::new(record("2", "Kopi Kita", "Food"))),
        });
        assert_eq!(app.detail.record.as_ref().map(|r| r.id.as_str()), Some("2"));
        assert!(!app.detail_loading());
    }

    #[tokio::test]
    async fn inactive_detail_redirects_home() {
        let mut app = loaded_app();
        app.open_favorites();
        app.open_detail("3".into(), View::Favorites);
        let generation = app.detail.fetch.generation;
        app.handle_event(AppEvent::Detail {
            generation,
            outcome: DetailOutcome::Inactive,
        });
        assert_eq!(app.view, View::Browse);
        assert!(app.detail.business_id.is_none());
    }

    #[tokio::test]
    async fn invalid_id_shows_message_without_fetching() {
        let mut app = loaded_app();
        app.open_detail("../etc".into(), View::Browse);
        assert_eq!(app.view, View::Detail);
        assert!(!app.detail_loading());
        assert_eq!(app.detail.message.as_deref(), Some("Error: invalid business id"));
    }

    #[tokio::test]
    async fn overlay_search_waits_for_debounce() {
        let mut app = loaded_app();
        app.open_overlay();
        for ch in "warung".chars() {
            app.overlay_input(ch);
        }
        app.maybe_apply_overlay_filter(Duration::from_secs(60));
        assert!(app.overlay.results.is_empty());
        assert!(app.overlay.needs_filter);

        app.maybe_apply_overlay_filter(Duration::ZERO);
        assert_eq!(app.overlay.results, [2]);
        assert!(!app.overlay.needs_filter);
    }

    #[tokio::test]
    async fn removing_from_favorites_view_clamps_selection() {
        let mut app = loaded_app();
        app.toggle_selected_favorite();
        app.move_selection(2);
        app.toggle_selected_favorite();
        app.open_favorites();
        app.move_favorites_selection(5);
        assert_eq!(app.favorites_selected, 1);

        app.remove_selected_favorite();
        assert_eq!(app.favorites_selected, 0);
        assert_eq!(app.selected_favorite().map(|f| f.id.as_str()), Some("1"));
    }
}
