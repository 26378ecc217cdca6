use crate::details::{DetailFetcher, DetailState, RatingCounter};
use crate::display::{DisplaySurface, TitleGuard};
use crate::fetch::FetchStatus;
use crate::keys::{KeyBinding, KeyBindings};
use crate::models::{TitleDetail, WatchSummary, WatchedEntry};
use crate::rating::StarRating;
use crate::search::{SearchFetcher, SearchState};
use crate::watchlist::WatchlistStore;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const HELP: &str = "\
Type to search. Commands:
  :open <n|id>   open a result (again to close)
  :close         close the open title
  :hover [n]     preview a rating (no n clears it)
  :rate <n>      rate the open title
  :add           add the rated title to your watchlist
  :remove <id>   remove a title from your watchlist
  :list          show your watchlist
  :key <name>    press a key (enter clears the query, escape closes the title)
  :help          show this help
  :quit          exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    ClearQuery,
    CloseDetail,
}

/// The open title. Dropping it releases the display title and the escape key.
struct DetailView {
    id: String,
    stars: StarRating,
    counter: RatingCounter,
    title: Option<TitleGuard>,
    escape: KeyBinding,
}

/// Interactive search / detail / watchlist panes driven by input lines.
pub struct Session<W: Write> {
    search: SearchFetcher,
    details: DetailFetcher,
    watchlist: WatchlistStore,
    keys: KeyBindings,
    surface: DisplaySurface,
    actions_tx: mpsc::UnboundedSender<KeyAction>,
    actions_rx: mpsc::UnboundedReceiver<KeyAction>,
    _enter: KeyBinding,
    query: String,
    view: Option<DetailView>,
    rating_labels: Vec<String>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(
        search: SearchFetcher,
        details: DetailFetcher,
        watchlist: WatchlistStore,
        surface: DisplaySurface,
        out: W,
    ) -> Self {
        let keys = KeyBindings::new();
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let tx = actions_tx.clone();
        let enter = keys.bind("Enter", move || {
            let _ = tx.send(KeyAction::ClearQuery);
        });

        Self {
            search,
            details,
            watchlist,
            keys,
            surface,
            actions_tx,
            actions_rx,
            _enter: enter,
            query: String::new(),
            view: None,
            rating_labels: Vec::new(),
            out,
        }
    }

    /// Per-star labels for the rating widget.
    pub fn with_rating_labels(mut self, labels: Vec<String>) -> Self {
        self.rating_labels = labels;
        self
    }

    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        let mut search_rx = self.search.subscribe();
        let mut detail_rx = self.details.subscribe();

        writeln!(self.out, "{}", HELP)?;
        self.show_watched()?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if self.handle_line(&line)? == Flow::Quit {
                        break;
                    }
                }
                Ok(()) = search_rx.changed() => {
                    let state = search_rx.borrow_and_update().clone();
                    self.show_search(&state)?;
                }
                Ok(()) = detail_rx.changed() => {
                    let state = detail_rx.borrow_and_update().clone();
                    self.show_detail(&state)?;
                }
            }
        }

        info!("Session ended");
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let Some(command) = line.strip_prefix(':') else {
            self.set_query(line);
            return Ok(Flow::Continue);
        };

        let (name, arg) = match command.trim().split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };
        debug!("Command {} {:?}", name, arg);

        match name {
            "quit" | "q" => return Ok(Flow::Quit),
            "help" => writeln!(self.out, "{}", HELP)?,
            "open" => self.open(arg)?,
            "close" => self.close()?,
            "hover" => self.hover(arg)?,
            "rate" => self.rate(arg)?,
            "add" => self.add()?,
            "remove" => self.remove(arg)?,
            "list" => self.show_watched()?,
            "key" => {
                if self.keys.dispatch(arg) == 0 {
                    writeln!(self.out, "Nothing bound to {}", arg)?;
                }
                self.drain_actions()?;
            }
            other => writeln!(self.out, "Unknown command :{} (try :help)", other)?,
        }
        Ok(Flow::Continue)
    }

    fn drain_actions(&mut self) -> Result<()> {
        while let Ok(action) = self.actions_rx.try_recv() {
            match action {
                KeyAction::ClearQuery => {
                    self.set_query("");
                    writeln!(self.out, "Search cleared")?;
                }
                KeyAction::CloseDetail => self.close()?,
            }
        }
        Ok(())
    }

    fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.search.observe(query);
    }

    fn open(&mut self, arg: &str) -> Result<()> {
        let id = match arg.parse::<usize>() {
            Ok(n) => match self.search.state().data.get(n.wrapping_sub(1)) {
                Some(result) => result.id.clone(),
                None => {
                    writeln!(self.out, "No result number {}", n)?;
                    return Ok(());
                }
            },
            Err(_) if !arg.is_empty() => arg.to_string(),
            Err(_) => {
                writeln!(self.out, "Usage: :open <n|id>")?;
                return Ok(());
            }
        };

        if self.view.as_ref().is_some_and(|v| v.id == id) {
            return self.close();
        }

        let tx = self.actions_tx.clone();
        let on_escape = move || {
            let _ = tx.send(KeyAction::CloseDetail);
        };
        // an open view hands its escape binding over instead of binding a second one
        let escape = match self.view.take() {
            Some(DetailView {
                escape: mut binding,
                ..
            }) => {
                binding.rebind("Escape", on_escape);
                binding
            }
            None => self.keys.bind("Escape", on_escape),
        };
        let stars = rating_widget(
            self.watchlist.max_rating(),
            &self.rating_labels,
            self.watchlist.get(&id),
        );
        self.view = Some(DetailView {
            id: id.clone(),
            stars,
            counter: RatingCounter::default(),
            title: None,
            escape,
        });
        self.details.observe(Some(&id));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.view.take().is_some() {
            self.details.observe(None);
            writeln!(self.out, "[{}]", self.surface.title())?;
            self.show_watched()?;
        }
        Ok(())
    }

    fn hover(&mut self, arg: &str) -> Result<()> {
        let Some(view) = self.view.as_mut() else {
            writeln!(self.out, "No title open")?;
            return Ok(());
        };
        match arg.parse::<u8>() {
            Ok(star) => view.stars.hover_in(star),
            Err(_) => view.stars.hover_out(),
        }
        writeln!(self.out, "{}", view.stars.render())?;
        Ok(())
    }

    fn rate(&mut self, arg: &str) -> Result<()> {
        let Some(view) = self.view.as_mut() else {
            writeln!(self.out, "No title open")?;
            return Ok(());
        };
        if let Some(entry) = self.watchlist.get(&view.id) {
            writeln!(self.out, "{}", rated_line(entry))?;
            return Ok(());
        }
        match arg.parse::<u8>().ok().and_then(|star| view.stars.click(star)) {
            Some(star) => {
                view.counter.record(star);
                writeln!(self.out, "{}  (:add to save)", view.stars.render())?;
            }
            None => writeln!(
                self.out,
                "Rating must be between 1 and {}",
                view.stars.max_rating()
            )?,
        }
        Ok(())
    }

    fn add(&mut self) -> Result<()> {
        let Some(view) = self.view.as_ref() else {
            writeln!(self.out, "No title open")?;
            return Ok(());
        };
        let state = self.details.state();
        let detail = match (&state.data, state.status) {
            (Some(detail), FetchStatus::Success) if state.subject == view.id => detail.clone(),
            _ => {
                writeln!(self.out, "Details are not loaded yet")?;
                return Ok(());
            }
        };
        if view.stars.rating() == 0 {
            writeln!(self.out, "Rate the title first (:rate <n>)")?;
            return Ok(());
        }

        let entry = WatchedEntry::from_detail(&detail, view.stars.rating(), view.counter.changes());
        match self.watchlist.append(entry) {
            Ok(_) => {
                writeln!(self.out, "Added {}", detail.title)?;
                self.close()?;
            }
            Err(e) => {
                warn!("Could not add {}: {}", detail.id, e);
                writeln!(self.out, "😔 {}", e)?;
            }
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        if id.is_empty() {
            writeln!(self.out, "Usage: :remove <id>")?;
            return Ok(());
        }
        match self.watchlist.remove(id) {
            Ok(0) => writeln!(self.out, "{} is not in your watchlist", id)?,
            Ok(_) => self.show_watched()?,
            Err(e) => writeln!(self.out, "😔 {}", e)?,
        }
        Ok(())
    }

    fn show_search(&mut self, state: &SearchState) -> Result<()> {
        if state.subject != self.query {
            return Ok(());
        }
        let rendered = render_search(state);
        if !rendered.is_empty() {
            writeln!(self.out, "{}", rendered)?;
        }
        Ok(())
    }

    fn show_detail(&mut self, state: &DetailState) -> Result<()> {
        let Some(view) = self.view.as_mut() else {
            return Ok(());
        };
        if state.subject != view.id {
            return Ok(());
        }

        match (state.status, &state.data) {
            (FetchStatus::Success, Some(detail)) => {
                if !detail.title.is_empty() {
                    view.title = Some(self.surface.acquire(&detail.title));
                }
                let rendered = render_detail(detail, &view.stars, self.watchlist.get(&view.id));
                writeln!(self.out, "[{}]\n{}", self.surface.title(), rendered)?;
            }
            (FetchStatus::Loading, _) => writeln!(self.out, "Loading...")?,
            (FetchStatus::Error, _) => writeln!(self.out, "😔 {}", state.error_message)?,
            _ => {}
        }
        Ok(())
    }

    fn show_watched(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "{}\n{}",
            render_summary(&self.watchlist.summary()),
            render_watched(self.watchlist.entries())
        )?;
        Ok(())
    }
}

pub fn render_search(state: &SearchState) -> String {
    match state.status {
        FetchStatus::Idle => String::new(),
        FetchStatus::Loading => "Loading...".to_string(),
        FetchStatus::Error => format!("😔 {}", state.error_message),
        FetchStatus::Success => {
            let mut out = format!("Found {} results", state.data.len());
            for (i, result) in state.data.iter().enumerate() {
                out.push_str(&format!(
                    "\n  {:>2}. {} (🗓 {}) [{}]",
                    i + 1,
                    result.title,
                    result.year,
                    result.id
                ));
            }
            out
        }
    }
}

/// Star widget for a title, preset to the stored rating when it was already rated.
pub fn rating_widget(max_rating: u8, labels: &[String], watched: Option<&WatchedEntry>) -> StarRating {
    let stars = StarRating::new(max_rating).with_messages(labels.to_vec());
    match watched {
        Some(entry) => stars.with_default(entry.user_rating),
        None => stars,
    }
}

pub fn render_detail(detail: &TitleDetail, stars: &StarRating, watched: Option<&WatchedEntry>) -> String {
    let rating = match watched {
        Some(entry) => format!("{}\n{}", stars.render(), rated_line(entry)),
        None => stars.render(),
    };
    format!(
        "{} ({})\n{} • {}\n{}\n⭐ {} IMDb rating\n{}\n\n{}\nStarring: {}\nDirected by {}",
        detail.title,
        detail.year,
        detail.released,
        detail.runtime,
        detail.genre,
        detail.imdb_rating,
        rating,
        detail.plot,
        detail.actors,
        detail.director
    )
}

fn rated_line(entry: &WatchedEntry) -> String {
    format!("You have rated this movie {} ⭐", entry.user_rating)
}

pub fn render_summary(summary: &WatchSummary) -> String {
    let fmt = |value: Option<f64>, precision: usize| match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    };
    format!(
        "Movies you watched\n  #️⃣ {} movies  ⭐️ {}  🌟 {}  ⏳ {} min",
        summary.count,
        fmt(summary.average_imdb_rating, 2),
        fmt(summary.average_user_rating, 2),
        fmt(summary.average_runtime_minutes, 0)
    )
}

pub fn render_watched(entries: &[WatchedEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "  {} [{}]  ⭐️ {}  🌟 {}  ⏳ {} min",
                e.title, e.id, e.imdb_rating, e.user_rating, e.runtime_minutes
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
