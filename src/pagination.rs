//! Cursor pagination with fixed pacing between page requests.

use std::future::Future;
use std::time::Duration;

use crate::{AppError, Result};

/// One page of a cursor-paginated API call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// A page from a listing endpoint, where a cursor alone means there is more.
    pub fn listing(items: Vec<T>, next_cursor: Option<String>) -> Self {
        let next_cursor = next_cursor.filter(|c| !c.is_empty());
        Self {
            items,
            has_more: next_cursor.is_some(),
            next_cursor,
        }
    }

    /// The last page of a result set.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
            next_cursor: None,
        }
    }

    /// Cursor for the following request, if pagination should continue.
    pub fn continuation(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Items gathered from a paginated call, plus whether the run stopped early.
#[derive(Debug, Default)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub truncated: bool,
    pub error: Option<AppError>,
}

impl<T> Fetched<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            truncated: false,
            error: None,
        }
    }

    pub fn partial(items: Vec<T>, error: AppError) -> Self {
        Self {
            items,
            truncated: true,
            error: Some(error),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Cooperative delay inserted between successive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::none()
    }
}

/// Request pages until the endpoint stops returning a continuation cursor.
///
/// The pacer pauses only between two requests. A failed request ends the run and the
/// items accumulated so far come back as a truncated result.
pub async fn collect_pages<T, F, Fut>(pacer: &Pacer, mut fetch: F) -> Fetched<T>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut first = true;

    loop {
        if !first {
            pacer.pause().await;
        }
        first = false;

        let page = match fetch(cursor.take()).await {
            Ok(page) => page,
            Err(e) => return Fetched::partial(items, e),
        };

        let next = page.continuation().map(str::to_string);
        items.extend(page.items);

        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Fetched::complete(items)
}
