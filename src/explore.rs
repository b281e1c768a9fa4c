//! Interactive composition search.
//!
//! Reads one command per line, keeps the current query between commands and
//! prints the resulting page after every change.

use std::io::Write;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::engine::filter::parse_slot_tokens;
use crate::engine::{self, EngineError, RoleSlot, SearchQuery, SortKey, StatColumn};
use crate::models::RoleCatalog;
use crate::refresh::{RefreshOutcome, StoreRefresher};
use crate::render;

pub const HELP: &str = "\
Commands:
  tank|healer|dps1|dps2|dps3 <tokens>  set a slot (no tokens clears it)
                                       tokens: spec tokens or @tank @healer @mdps @rdps @dps
  clear                                clear every slot and go to page 1
  sort total|avg|max_avg_total|max_total_avg
  stat max|std                         third stat column
  page <n> | next | prev               paging
  show                                 print the current page again
  reload                               reload the export now
  help                                 this text
  quit                                 leave";

/// Session errors. None of them end the session.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("Unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ExploreCommand {
    Slot(RoleSlot, String),
    Clear,
    Sort(SortKey),
    Stat(StatColumn),
    Page(i64),
    Next,
    Prev,
    Show,
    Reload,
    Help,
    Quit,
    Empty,
}

impl ExploreCommand {
    pub fn parse(line: &str) -> Result<Self, ExploreError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        if let Ok(slot) = word.parse::<RoleSlot>() {
            return Ok(ExploreCommand::Slot(slot, rest.to_string()));
        }

        let command = match word.to_ascii_lowercase().as_str() {
            "" => ExploreCommand::Empty,
            "clear" => ExploreCommand::Clear,
            "sort" => ExploreCommand::Sort(required(rest, "sort")?.parse()?),
            "stat" => ExploreCommand::Stat(
                required(rest, "stat")?
                    .parse()
                    .map_err(ExploreError::InvalidArgument)?,
            ),
            "page" => {
                let arg = required(rest, "page")?;
                let page = arg
                    .parse::<i64>()
                    .map_err(|_| ExploreError::InvalidArgument(format!("not a page number: {}", arg)))?;
                ExploreCommand::Page(page)
            }
            "next" | "n" => ExploreCommand::Next,
            "prev" | "p" => ExploreCommand::Prev,
            "show" => ExploreCommand::Show,
            "reload" => ExploreCommand::Reload,
            "help" | "?" => ExploreCommand::Help,
            "quit" | "exit" | "q" => ExploreCommand::Quit,
            other => return Err(ExploreError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

fn required<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ExploreError> {
    if rest.is_empty() {
        Err(ExploreError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

/// What the caller should do after a command was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Search,
    Reload,
    Help,
    Quit,
    Nothing,
}

/// The query state of a session.
#[derive(Debug, Clone, Default)]
pub struct ExploreSession {
    pub query: SearchQuery,
}

impl ExploreSession {
    pub fn new(sort: SortKey, stat: StatColumn) -> Self {
        Self {
            query: SearchQuery {
                sort,
                stat,
                ..Default::default()
            },
        }
    }

    /// Apply a command. Slot tokens are checked against the catalog here so a
    /// bad token leaves the query unchanged.
    pub fn apply(&mut self, command: ExploreCommand, catalog: &RoleCatalog) -> Result<Action, ExploreError> {
        let action = match command {
            ExploreCommand::Slot(slot, input) => {
                let tokens = parse_slot_tokens(&input, catalog)?;
                self.query.slots.set(slot, tokens);
                self.query.page = 1;
                Action::Search
            }
            ExploreCommand::Clear => {
                self.query.slots.clear();
                self.query.page = 1;
                Action::Search
            }
            ExploreCommand::Sort(sort) => {
                self.query.sort = sort;
                self.query.page = 1;
                Action::Search
            }
            ExploreCommand::Stat(stat) => {
                self.query.stat = stat;
                Action::Search
            }
            ExploreCommand::Page(page) => {
                self.query.page = page;
                Action::Search
            }
            ExploreCommand::Next => {
                self.query.page = self.query.page.saturating_add(1);
                Action::Search
            }
            ExploreCommand::Prev => {
                self.query.page = self.query.page.saturating_sub(1);
                Action::Search
            }
            ExploreCommand::Show => Action::Search,
            ExploreCommand::Reload => Action::Reload,
            ExploreCommand::Help => Action::Help,
            ExploreCommand::Quit => Action::Quit,
            ExploreCommand::Empty => Action::Nothing,
        };
        Ok(action)
    }

    /// Adopt the page a search actually served, so paging past the end
    /// stays on the last page.
    pub fn settle_page(&mut self, served: usize) {
        self.query.page = served as i64;
    }
}

/// Run a session until `quit` or end of input.
pub async fn run<R: AsyncBufRead + Unpin, W: Write>(
    input: R,
    mut output: W,
    session: &mut ExploreSession,
    refresher: &StoreRefresher,
    catalog: &RoleCatalog,
    colored: bool,
) -> std::io::Result<()> {
    search_and_print(&mut output, session, refresher, catalog, colored).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let action = match ExploreCommand::parse(&line).and_then(|c| session.apply(c, catalog)) {
            Ok(action) => action,
            Err(e) => {
                writeln!(output, "error: {}", e)?;
                continue;
            }
        };
        debug!("Explore command {:?} -> {:?}", line.trim(), action);

        match action {
            Action::Search => search_and_print(&mut output, session, refresher, catalog, colored).await?,
            Action::Reload => {
                match refresher.refresh_once().await {
                    Ok(RefreshOutcome::Reloaded { report, .. }) => writeln!(
                        output,
                        "reloaded: {} compositions ({} excluded)",
                        report.accepted,
                        report.excluded()
                    )?,
                    Ok(RefreshOutcome::Unchanged) => writeln!(output, "export unchanged")?,
                    Err(e) => {
                        warn!("Reload failed: {}", e);
                        writeln!(output, "reload failed: {}", e)?;
                    }
                }
                search_and_print(&mut output, session, refresher, catalog, colored).await?;
            }
            Action::Help => writeln!(output, "{}", HELP)?,
            Action::Quit => break,
            Action::Nothing => {}
        }
    }

    output.flush()
}

async fn search_and_print<W: Write>(
    output: &mut W,
    session: &mut ExploreSession,
    refresher: &StoreRefresher,
    catalog: &RoleCatalog,
    colored: bool,
) -> std::io::Result<()> {
    let store = refresher.handle().snapshot().await;
    match engine::search(&store, &session.query, catalog) {
        Ok(response) => {
            session.settle_page(response.page.page);
            writeln!(output, "{}", render::render_response(&response, colored))
        }
        Err(e) => writeln!(output, "error: {}", e),
    }
}
