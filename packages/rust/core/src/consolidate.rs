//! Stage 4: merge member artifacts into `final_team_members.csv`.

use std::collections::HashMap;

use teamscrape_shared::{ConsolidatedRow, ResolvedPage, Result};
use teamscrape_storage::CheckpointStore;
use tracing::{debug, info, instrument, warn};

/// Join every persisted member artifact with its page.
///
/// Artifacts are read in sorted key order and records keep their in-file
/// order. A person whose link matches no page keeps empty company and
/// location. A corrupt artifact fails the whole consolidation.
pub fn consolidate(store: &CheckpointStore, pages: &[ResolvedPage]) -> Result<Vec<ConsolidatedRow>> {
    let mut by_link: HashMap<&str, &ResolvedPage> = HashMap::new();
    for page in pages.iter().filter(|p| p.is_resolved()) {
        by_link.entry(page.link.as_str()).or_insert(page);
    }

    let mut rows = Vec::new();
    for key in store.list_member_keys()? {
        let people = store.load_members(&key)?;
        debug!(%key, count = people.len(), "merging artifact");
        rows.extend(people.iter().map(|person| {
            let page = by_link.get(person.source_url.as_str()).copied();
            if page.is_none() {
                warn!(url = %person.source_url, name = %person.name, "no page for person");
            }
            ConsolidatedRow::join(person, page)
        }));
    }
    Ok(rows)
}

/// Consolidate from whatever is on disk and write the output table.
///
/// A missing page list only means no person can be joined.
#[instrument(skip_all)]
pub fn run_consolidation(store: &CheckpointStore) -> Result<Vec<ConsolidatedRow>> {
    let pages = match store.load_pages() {
        Ok(pages) => pages,
        Err(e) if e.is_not_found() => {
            warn!("no page list on disk, consolidating without company data");
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    write_consolidated(store, &pages)
}

/// Consolidate against `pages` and write the output table.
pub fn write_consolidated(store: &CheckpointStore, pages: &[ResolvedPage]) -> Result<Vec<ConsolidatedRow>> {
    let rows = consolidate(store, pages)?;
    store.save_consolidated(&rows)?;
    info!(rows = rows.len(), "consolidated output written");
    Ok(rows)
}
