use std::collections::HashMap;

use crate::model::User;
use crate::observer::{ArchiveEvent, Observer};
use crate::pagination::{Pacer, collect_pages};
use crate::slack::WorkspaceApi;

/// User id to display name, filled once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    names: HashMap<String, String>,
}

impl UserDirectory {
    /// Page through every workspace user.
    ///
    /// A failure part-way is reported and whatever was loaded is kept; the directory may
    /// end up empty, in which case names resolve to raw ids.
    pub async fn load<A: WorkspaceApi + ?Sized>(
        api: &A,
        pacer: &Pacer,
        observer: &dyn Observer,
    ) -> Self {
        let fetched = collect_pages(pacer, |cursor| api.list_users(cursor)).await;

        let directory = Self::from_users(&fetched.items);
        match fetched.error {
            Some(e) => observer.event(&ArchiveEvent::UsersFailed {
                loaded: directory.len(),
                error: e.to_string(),
                transient: e.is_transient(),
            }),
            None => observer.event(&ArchiveEvent::UsersLoaded {
                count: directory.len(),
            }),
        }
        directory
    }

    pub fn from_users(users: &[User]) -> Self {
        let names = users
            .iter()
            .map(|user| (user.id.clone(), user.display_name()))
            .collect();
        Self { names }
    }

    /// Cached name for `id`, or `None` when the user is not known.
    pub fn lookup(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Cached name for `id`, falling back to the id itself.
    pub fn resolve(&self, id: &str) -> String {
        self.lookup(id).unwrap_or(id).to_string()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
